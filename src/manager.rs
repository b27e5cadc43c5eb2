//! Translation state manager.
//!
//! Owns the current language and its translations, runs the
//! cache-then-revalidate startup, mediates language switches and republishes
//! every change to subscribers.
//!
//! # Consistency
//!
//! - The language and the translation map are always replaced together under
//!   one lock, so readers never see a map paired with another language.
//! - Each switch takes a new request number. A fetch result is published only
//!   if its request is still the newest one; stale results are dropped.
//! - The background revalidation started by a cache hit is published only if
//!   nothing else was published or requested since the cached state.
//! - Results are persisted only when they are the published state. Persisting
//!   and notifying happen one publish at a time in revision order, and a
//!   publish already replaced by a newer one skips both.
//!
//! Provider and storage failures never reach the caller: they are logged and
//! the published state is left as it was (or, on a startup without usable
//! cache, published with an empty map so lookups fall back to keys).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::i18n::{
    environment_language_or, resolve, LanguageCode, MetricsReport, TranslationMap,
    TranslationMetrics,
};
use crate::provider::{ProviderError, TranslationProvider};
use crate::state::TranslationState;
use crate::storage::TranslationStorage;
use crate::subscription::{Notifier, Subscription};

/// Startup options for `I18n::configure`.
#[derive(Debug, Clone)]
pub struct I18nOptions {
    /// Language to use regardless of the stored preference
    pub language: Option<LanguageCode>,

    /// Whether a matching cached translation map may be published before the
    /// provider answers
    pub cache: bool,
}

impl I18nOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: impl Into<LanguageCode>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}

impl Default for I18nOptions {
    fn default() -> Self {
        Self {
            language: None,
            cache: true,
        }
    }
}

/// Construction-time settings of a state manager.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Language used when neither an explicit nor a stored language exists
    pub environment_language: LanguageCode,

    /// Upper bound for a single provider fetch; `None` waits indefinitely
    pub fetch_timeout: Option<Duration>,
}

impl ManagerSettings {
    pub fn new(environment_language: impl Into<LanguageCode>) -> Self {
        Self {
            environment_language: environment_language.into(),
            fetch_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Settings using the process locale, or `fallback` when none is set.
    pub fn from_environment(fallback: &LanguageCode) -> Self {
        Self::new(environment_language_or(fallback))
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Option<Duration>) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }
}

/// Mutable manager state, guarded by one lock.
#[derive(Debug, Default)]
struct ManagerState {
    current: TranslationState,

    /// Number of the newest switch request
    requested: u64,

    /// Incremented on every visible change of `current`
    revision: u64,
}

/// Outcome of trying to publish a fetched translation map.
enum Publish {
    /// Published as `revision`; subscribers must be notified with this state
    Changed(TranslationState, u64),
    /// Still current at `revision`, but identical to what was already published
    Unchanged(u64),
    /// A newer request or publish took precedence
    Superseded,
}

struct Inner {
    provider: Arc<dyn TranslationProvider>,
    storage: TranslationStorage,
    settings: ManagerSettings,
    state: Mutex<ManagerState>,
    /// Held while a publish is persisted and announced
    commit: Mutex<()>,
    notifier: Notifier,
    metrics: TranslationMetrics,
    configured: AtomicBool,
    revalidation: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a translation state manager. Clones share the same state.
#[derive(Clone)]
pub struct I18n {
    inner: Arc<Inner>,
}

impl I18n {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        storage: TranslationStorage,
        settings: ManagerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                storage,
                settings,
                state: Mutex::new(ManagerState::default()),
                commit: Mutex::new(()),
                notifier: Notifier::new(TranslationState::default()),
                metrics: TranslationMetrics::new(),
                configured: AtomicBool::new(false),
                revalidation: Mutex::new(None),
            }),
        }
    }

    /// Pick the initial language and publish its translations.
    ///
    /// With a cached map for the resolved language (and `options.cache`),
    /// the cached map is published right away and a refresh runs in the
    /// background. Otherwise this waits for the provider. Only the first call
    /// has an effect.
    pub async fn configure(&self, options: I18nOptions) {
        if self.inner.configured.swap(true, Ordering::SeqCst) {
            warn!("I18N: configure called more than once, ignoring");
            return;
        }

        let last_used = self.inner.storage.get_last_used_language();
        let target = resolve(
            options.language.as_ref(),
            last_used.as_ref(),
            &self.inner.settings.environment_language,
        );

        if options.cache {
            match self.inner.storage.get_cached_translations() {
                Some(cached) if cached.language == target => {
                    debug!("I18N: Using cached translations for {}", target);
                    self.inner.metrics.record_cache_hit();
                    self.publish_cached(target, cached.translations);
                    return;
                }
                Some(cached) => debug!(
                    "I18N: Cached translations are for {}, not {}",
                    cached.language, target
                ),
                None => debug!("I18N: No cached translations"),
            }
        }

        self.inner.metrics.record_cache_miss();
        info!("I18N: Loading translations for {} from provider", target);

        let fetched = match self.fetch(&target).await {
            Ok(translations) => Some(translations),
            Err(e) => {
                error!("I18N: Failed to load translations for {}: {}", target, e);
                None
            }
        };

        let persist = fetched.is_some();
        let translations = Arc::new(fetched.unwrap_or_default());
        // A switch that finished first already owns the state
        let outcome = self.publish_if(&target, translations.clone(), |state| {
            !state.current.initialized
        });

        match outcome {
            Publish::Superseded => {
                debug!("I18N: Language changed while starting up, keeping it");
            }
            Publish::Changed(state, revision) => {
                self.commit(revision, || {
                    if persist {
                        self.inner
                            .storage
                            .set_cached_translations(&target, &translations);
                    }
                    info!("I18N: Initialized with language {}", target);
                    self.inner.notifier.notify(&state);
                });
            }
            Publish::Unchanged(_) => {}
        }
    }

    /// Switch to `language`, waiting for its translations.
    ///
    /// Does nothing if `language` is already current. On provider failure
    /// the current state is kept and the error is only logged.
    pub async fn switch_language(&self, language: impl Into<LanguageCode>) {
        let language = language.into();

        let request = {
            let mut state = self.lock_state();
            state.requested += 1;
            if state.current.language.as_ref() == Some(&language) {
                // Still supersedes switches in flight: the user is back on this language.
                debug!("I18N: {} is already the current language", language);
                return;
            }
            state.requested
        };

        let translations = match self.fetch(&language).await {
            Ok(translations) => Arc::new(translations),
            Err(e) => {
                error!("I18N: Failed to switch language to {}: {}", language, e);
                return;
            }
        };

        let outcome = self.publish_if(&language, translations.clone(), |state| {
            state.requested == request
        });

        match outcome {
            Publish::Superseded => {
                self.inner.metrics.record_superseded();
                warn!(
                    "I18N: Dropping translations for {}, a newer language switch was requested",
                    language
                );
            }
            Publish::Changed(state, revision) => {
                self.commit(revision, || {
                    self.inner
                        .storage
                        .set_cached_translations(&language, &translations);
                    self.inner.storage.set_last_used_language(&language);
                    info!("I18N: Switched language to {}", language);
                    self.inner.notifier.notify(&state);
                });
            }
            Publish::Unchanged(revision) => {
                self.commit(revision, || {
                    self.inner.storage.set_last_used_language(&language);
                });
            }
        }
    }

    /// Translation for `key`, or `key` itself when there is none.
    pub fn translate(&self, key: &str) -> String {
        let state = self.lock_state();
        if !state.current.translations.contains_key(key) {
            trace!("I18N: Missing translation for key '{}'", key);
        }
        state.current.translate(key)
    }

    /// Current language; `None` before the first publish.
    pub fn language(&self) -> Option<LanguageCode> {
        self.lock_state().current.language.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_state().current.initialized
    }

    /// Snapshot of the published state.
    pub fn state(&self) -> TranslationState {
        self.lock_state().current.clone()
    }

    /// Call `callback` after every future change. There is no replay of the
    /// current state; read it with `state()`.
    ///
    /// Callbacks for successive changes never overlap. A callback must not
    /// block on a language switch of the same manager.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TranslationState) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe(callback)
    }

    /// Receiver that is marked changed on every future publish.
    pub fn watch(&self) -> watch::Receiver<TranslationState> {
        self.inner.notifier.watch()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.inner.metrics.report()
    }

    /// Wait for the background refresh started by a cached startup, if any.
    pub async fn wait_for_revalidation(&self) {
        let handle = self
            .inner
            .revalidation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("I18N: Background refresh task did not complete: {}", e);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the cached pair and start refreshing it from the provider.
    fn publish_cached(&self, language: LanguageCode, translations: TranslationMap) {
        let (published, since) = {
            let mut state = self.lock_state();
            if state.current.initialized {
                // A switch finished before startup did; it already owns the state.
                debug!("I18N: State already published, skipping cached translations");
                return;
            }
            state.current = TranslationState {
                language: Some(language.clone()),
                translations: Arc::new(translations),
                initialized: true,
            };
            state.revision += 1;
            (state.current.clone(), (state.revision, state.requested))
        };

        self.commit(since.0, || self.inner.notifier.notify(&published));

        let manager = self.clone();
        let handle = tokio::spawn(async move {
            manager.revalidate(language, since).await;
        });
        *self
            .inner
            .revalidation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Refresh the cached pair. `since` is the `(revision, requested)` pair at
    /// publish time; any later publish or switch request wins over the refresh.
    async fn revalidate(&self, language: LanguageCode, since: (u64, u64)) {
        let translations = match self.fetch(&language).await {
            Ok(translations) => Arc::new(translations),
            Err(e) => {
                error!(
                    "I18N: Failed to refresh cached translations for {}: {}",
                    language, e
                );
                return;
            }
        };

        let outcome = self.publish_if(&language, translations.clone(), |state| {
            (state.revision, state.requested) == since
        });

        match outcome {
            Publish::Superseded => {
                self.inner.metrics.record_superseded();
                debug!(
                    "I18N: Language changed before refresh of {} finished, discarding",
                    language
                );
            }
            Publish::Changed(state, revision) => {
                self.commit(revision, || {
                    self.inner
                        .storage
                        .set_cached_translations(&language, &translations);
                    debug!("I18N: Done refreshing translations for {}", language);
                    self.inner.notifier.notify(&state);
                });
            }
            Publish::Unchanged(revision) => {
                self.commit(revision, || {
                    self.inner
                        .storage
                        .set_cached_translations(&language, &translations);
                    debug!("I18N: Cached translations for {} are up to date", language);
                });
            }
        }
    }

    /// Replace the published pair if `is_current` holds under the state lock.
    ///
    /// The lock is released before returning; callers persist and notify
    /// through `commit`.
    fn publish_if<F>(
        &self,
        language: &LanguageCode,
        translations: Arc<TranslationMap>,
        is_current: F,
    ) -> Publish
    where
        F: FnOnce(&ManagerState) -> bool,
    {
        let mut state = self.lock_state();
        if !is_current(&state) {
            return Publish::Superseded;
        }

        let unchanged = state.current.initialized
            && state.current.language.as_ref() == Some(language)
            && state.current.translations == translations;
        if unchanged {
            return Publish::Unchanged(state.revision);
        }

        state.current = TranslationState {
            language: Some(language.clone()),
            translations,
            initialized: true,
        };
        state.revision += 1;
        Publish::Changed(state.current.clone(), state.revision)
    }

    /// Persist and announce the publish made at `revision`.
    ///
    /// Commits run one at a time and are skipped once a newer revision has
    /// been published, so storage, `watch()` and the last callback always end
    /// on the newest published state.
    fn commit<F>(&self, revision: u64, effects: F)
    where
        F: FnOnce(),
    {
        let _commit = self
            .inner
            .commit
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let latest = self.lock_state().revision;
        if latest != revision {
            debug!(
                "I18N: Revision {} was replaced by {} before it was stored",
                revision, latest
            );
            return;
        }

        effects();
    }

    /// One provider call, bounded by the configured timeout.
    async fn fetch(&self, language: &LanguageCode) -> Result<TranslationMap, ProviderError> {
        self.inner.metrics.record_fetch();

        let load = self.inner.provider.load_translations(language);
        let result = match self.inner.settings.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, load).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(language.clone(), limit)),
            },
            None => load.await,
        };

        if result.is_err() {
            self.inner.metrics.record_fetch_failure();
        }
        result
    }
}

impl std::fmt::Debug for I18n {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18n")
            .field("language", &self.language())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
