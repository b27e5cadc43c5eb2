//! Persistent store for the last used language and the cached translations.
//!
//! Storage is best-effort: backend failures and unparseable entries are
//! logged and treated as absent, never surfaced to the state manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::i18n::{LanguageCode, TranslationMap};

/// Slot holding the raw code of the last language the user switched to
pub const LAST_USED_LANGUAGE_KEY: &str = "i18n.lastUsedLanguage";

/// Slot holding the JSON-serialized `CachedTranslations`
pub const CACHED_TRANSLATIONS_KEY: &str = "i18n.cachedTranslations";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A durable string-keyed slot store.
///
/// Reads and writes are synchronous.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage keeping one file per slot inside a directory.
///
/// The directory is created on first write. Writes go to a temporary file
/// that is renamed over the slot, so a reader never sees a half-written value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let tmp_path = self.dir.join(format!(".{}.tmp", key));

        fs::create_dir_all(&self.dir).map_err(|source| io_error(&self.dir, source))?;
        fs::write(&tmp_path, value).map_err(|source| io_error(&tmp_path, source))?;
        fs::rename(&tmp_path, &path).map_err(|source| io_error(&path, source))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A language and the translations fetched for it, persisted as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTranslations {
    pub language: LanguageCode,
    pub translations: TranslationMap,

    /// When the translations were fetched (absent in entries written by older versions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// The translation-specific view over a storage backend.
#[derive(Clone)]
pub struct TranslationStorage {
    backend: Arc<dyn StorageBackend>,
}

impl TranslationStorage {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Storage that only lives as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn get_last_used_language(&self) -> Option<LanguageCode> {
        self.read_slot(LAST_USED_LANGUAGE_KEY)
            .filter(|value| !value.is_empty())
            .map(LanguageCode::from)
    }

    pub fn set_last_used_language(&self, language: &LanguageCode) {
        self.write_slot(LAST_USED_LANGUAGE_KEY, language.as_str());
    }

    /// Read the cached pair. Unparseable entries count as absent.
    pub fn get_cached_translations(&self) -> Option<CachedTranslations> {
        let serialized = self.read_slot(CACHED_TRANSLATIONS_KEY)?;
        match serde_json::from_str(&serialized) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!("I18N: Ignoring corrupt cached translations: {}", e);
                None
            }
        }
    }

    /// Overwrite the cached pair with `translations` fetched for `language`.
    pub fn set_cached_translations(&self, language: &LanguageCode, translations: &TranslationMap) {
        let cached = CachedTranslations {
            language: language.clone(),
            translations: translations.clone(),
            fetched_at: Some(Utc::now()),
        };
        match serde_json::to_string(&cached) {
            Ok(serialized) => self.write_slot(CACHED_TRANSLATIONS_KEY, &serialized),
            Err(e) => warn!("I18N: Failed to serialize translations for {}: {}", language, e),
        }
    }

    fn read_slot(&self, key: &str) -> Option<String> {
        match self.backend.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("I18N: Failed to read {}: {}", key, e);
                None
            }
        }
    }

    fn write_slot(&self, key: &str, value: &str) {
        match self.backend.set_item(key, value) {
            Ok(()) => debug!("I18N: Stored {} ({} bytes)", key, value.len()),
            Err(e) => warn!("I18N: Failed to write {}: {}", key, e),
        }
    }
}

impl std::fmt::Debug for TranslationStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationStorage").finish_non_exhaustive()
    }
}
