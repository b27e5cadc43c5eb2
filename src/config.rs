use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::i18n::LanguageCode;
use crate::manager::{I18nOptions, ManagerSettings};
use crate::provider::{DirectoryProvider, HttpProvider, StaticProvider, TranslationProvider};
use crate::storage::{FileStorage, TranslationStorage};

/// Where translation maps are loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSource {
    /// Translations compiled into the binary
    Bundled,
    /// `<dir>/<language>.json` files
    Directory(PathBuf),
    /// `GET <base_url>/<language>.json`
    Http(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    // Startup
    pub language: Option<LanguageCode>,
    pub cache: bool,
    pub switch_to: Option<LanguageCode>,

    // Storage
    pub storage_dir: PathBuf,

    // Provider
    pub provider: ProviderSource,
    pub default_language: LanguageCode,
    pub fetch_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let provider = match (var("I18N_TRANSLATIONS_URL"), var("I18N_TRANSLATIONS_DIR")) {
            (Some(_), Some(_)) => {
                bail!("Set only one of I18N_TRANSLATIONS_URL and I18N_TRANSLATIONS_DIR")
            }
            (Some(url), None) => ProviderSource::Http(url),
            (None, Some(dir)) => ProviderSource::Directory(PathBuf::from(dir)),
            (None, None) => ProviderSource::Bundled,
        };

        let cache = match var("I18N_CACHE") {
            Some(value) => parse_bool(&value).context("I18N_CACHE must be true or false")?,
            None => true,
        };

        let fetch_timeout_secs: u64 = match var("I18N_FETCH_TIMEOUT_SECS") {
            Some(value) => value
                .parse()
                .context("I18N_FETCH_TIMEOUT_SECS must be a whole number of seconds")?,
            None => 10,
        };

        Ok(Self {
            // Startup
            language: var("I18N_LANGUAGE").map(LanguageCode::from),
            cache,
            switch_to: var("I18N_SWITCH_TO").map(LanguageCode::from),

            // Storage
            storage_dir: var("I18N_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".i18n")),

            // Provider
            provider,
            default_language: var("I18N_DEFAULT_LANGUAGE")
                .map(LanguageCode::from)
                .unwrap_or_else(|| LanguageCode::from("en")),
            // 0 disables the timeout
            fetch_timeout: (fetch_timeout_secs > 0).then(|| Duration::from_secs(fetch_timeout_secs)),
        })
    }

    pub fn options(&self) -> I18nOptions {
        I18nOptions {
            language: self.language.clone(),
            cache: self.cache,
        }
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings::from_environment(&self.default_language)
            .with_fetch_timeout(self.fetch_timeout)
    }

    pub fn storage(&self) -> TranslationStorage {
        TranslationStorage::new(Arc::new(FileStorage::new(&self.storage_dir)))
    }

    pub fn translation_provider(&self) -> Result<Arc<dyn TranslationProvider>> {
        let default = Some(self.default_language.clone());
        let provider: Arc<dyn TranslationProvider> = match &self.provider {
            ProviderSource::Bundled => Arc::new(
                StaticProvider::bundled()
                    .context("Failed to load bundled translations")?
                    .with_default_language(default),
            ),
            ProviderSource::Directory(dir) => {
                Arc::new(DirectoryProvider::new(dir).with_default_language(default))
            }
            ProviderSource::Http(url) => Arc::new(HttpProvider::new(url.as_str())),
        };
        Ok(provider)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean: {}", other),
    }
}
