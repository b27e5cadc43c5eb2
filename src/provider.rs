//! Translation providers: asynchronous sources of complete translation maps.
//!
//! A provider is asked for one language at a time and either returns every
//! key for that language or fails. What happens for a code the provider has
//! no translations for is provider-specific:
//!
//! - `StaticProvider` and `DirectoryProvider` substitute their default
//!   language when one is configured and only fail with `Unsupported`
//!   otherwise.
//! - `HttpProvider` fails with `Unsupported` when the server answers 404.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::i18n::{LanguageCode, LanguageRegistry, TranslationMap};
use crate::retry::{with_retry_if, RetryConfig};

const BUNDLED_ENGLISH: &str = include_str!("../translations/en.json");
const BUNDLED_GERMAN: &str = include_str!("../translations/de.json");

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no translations available for language '{0}'")]
    Unsupported(LanguageCode),

    #[error("failed to read translations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("translation server returned {status} for language '{language}'")]
    Http { status: u16, language: LanguageCode },

    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid translation payload for language '{language}': {source}")]
    Parse {
        language: LanguageCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("loading translations for '{0}' timed out after {1:?}")]
    Timeout(LanguageCode, Duration),
}

impl ProviderError {
    /// Whether retrying the same request may succeed (rate limits, 5xx, network errors).
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Request(_) | ProviderError::Timeout(..) => true,
            _ => false,
        }
    }
}

/// Asynchronous source of translation maps.
pub trait TranslationProvider: Send + Sync {
    fn load_translations<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<TranslationMap, ProviderError>>;
}

fn parse_translations(language: &LanguageCode, payload: &str) -> Result<TranslationMap, ProviderError> {
    serde_json::from_str(payload).map_err(|source| ProviderError::Parse {
        language: language.clone(),
        source,
    })
}

/// Codes are used as file names and URL path segments.
fn is_path_safe(language: &LanguageCode) -> bool {
    let code = language.as_str();
    !code.is_empty()
        && !code.starts_with('.')
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

// ==================== StaticProvider ====================

/// Provider serving translation maps held in memory.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    bundles: HashMap<LanguageCode, TranslationMap>,
    default_language: Option<LanguageCode>,
    latency: Duration,
}

impl StaticProvider {
    /// An empty provider whose default language is the registry default.
    pub fn new() -> Self {
        Self {
            bundles: HashMap::new(),
            default_language: Some(LanguageCode::from(
                LanguageRegistry::get().default_language().code,
            )),
            latency: Duration::ZERO,
        }
    }

    /// Provider with the translations shipped in `translations/`.
    pub fn bundled() -> Result<Self, ProviderError> {
        let english = LanguageCode::from("en");
        let german = LanguageCode::from("de");
        let english_map = parse_translations(&english, BUNDLED_ENGLISH)?;
        let german_map = parse_translations(&german, BUNDLED_GERMAN)?;

        Ok(Self::new()
            .with_language(english, english_map)
            .with_language(german, german_map))
    }

    pub fn with_language(mut self, language: impl Into<LanguageCode>, translations: TranslationMap) -> Self {
        self.bundles.insert(language.into(), translations);
        self
    }

    /// Language served instead of unknown codes; `None` makes unknown codes fail.
    pub fn with_default_language(mut self, language: Option<LanguageCode>) -> Self {
        self.default_language = language;
        self
    }

    /// Simulated network delay before every response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationProvider for StaticProvider {
    fn load_translations<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<TranslationMap, ProviderError>> {
        async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            if let Some(translations) = self.bundles.get(language) {
                return Ok(translations.clone());
            }

            match &self.default_language {
                Some(default) if default != language => {
                    debug!(
                        "I18N: No translations for '{}', serving '{}' instead",
                        language, default
                    );
                    self.bundles
                        .get(default)
                        .cloned()
                        .ok_or_else(|| ProviderError::Unsupported(language.clone()))
                }
                _ => Err(ProviderError::Unsupported(language.clone())),
            }
        }
        .boxed()
    }
}

// ==================== DirectoryProvider ====================

/// Provider reading `<dir>/<language>.json` files.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
    default_language: Option<LanguageCode>,
}

impl DirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            default_language: None,
        }
    }

    /// Language file read when the requested one does not exist.
    pub fn with_default_language(mut self, language: Option<LanguageCode>) -> Self {
        self.default_language = language;
        self
    }

    /// Read one language file; `Ok(None)` when it does not exist.
    async fn read_file(&self, language: &LanguageCode) -> Result<Option<TranslationMap>, ProviderError> {
        if !is_path_safe(language) {
            return Ok(None);
        }

        let path = self.dir.join(format!("{}.json", language));
        match tokio::fs::read_to_string(&path).await {
            Ok(payload) => parse_translations(language, &payload).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProviderError::Io { path, source }),
        }
    }
}

impl TranslationProvider for DirectoryProvider {
    fn load_translations<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<TranslationMap, ProviderError>> {
        async move {
            if let Some(translations) = self.read_file(language).await? {
                return Ok(translations);
            }

            if let Some(default) = self.default_language.as_ref().filter(|d| *d != language) {
                debug!(
                    "I18N: No translation file for '{}', reading '{}' instead",
                    language, default
                );
                if let Some(translations) = self.read_file(default).await? {
                    return Ok(translations);
                }
            }

            Err(ProviderError::Unsupported(language.clone()))
        }
        .boxed()
    }
}

// ==================== HttpProvider ====================

/// Provider fetching `GET <base_url>/<language>.json`.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::translation_fetch(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url_for(&self, language: &LanguageCode) -> String {
        format!("{}/{}.json", self.base_url, language)
    }

    async fn fetch_once(&self, language: &LanguageCode) -> Result<TranslationMap, ProviderError> {
        let response = self
            .client
            .get(self.url_for(language))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::Unsupported(language.clone()));
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                language: language.clone(),
            });
        }

        let payload = response.text().await?;
        parse_translations(language, &payload)
    }
}

impl TranslationProvider for HttpProvider {
    fn load_translations<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<TranslationMap, ProviderError>> {
        async move {
            if !is_path_safe(language) {
                return Err(ProviderError::Unsupported(language.clone()));
            }

            with_retry_if(
                &self.retry,
                &format!("Loading translations for {}", language),
                || self.fetch_once(language),
                ProviderError::is_transient,
            )
            .await
        }
        .boxed()
    }
}
