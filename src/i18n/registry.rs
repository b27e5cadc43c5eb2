//! Language registry: the languages the bundled translation files cover.
//!
//! This registry is consulted only by providers that need a substitution
//! target for unsupported codes and by the binary when reporting languages.
//! The resolver and the state manager never validate codes against it.

use std::sync::OnceLock;

/// Metadata for a language with shipped translations.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Language code as used in translation file names (e.g., "en", "de")
    pub code: &'static str,

    /// English name of the language (e.g., "English", "German")
    pub name: &'static str,

    /// Native name of the language (e.g., "English", "Deutsch")
    pub native_name: &'static str,

    /// Whether this is the substitution target for unsupported codes (only one should be true)
    pub is_default: bool,

    /// Whether this language is offered to users
    pub enabled: bool,
}

/// Read-only table of supported languages.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all enabled languages.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get the default language, used when a provider is asked for a code it
    /// has no translations for.
    ///
    /// Falls back to the first registered language if no entry is flagged as
    /// default.
    pub fn default_language(&self) -> &LanguageConfig {
        self.languages
            .iter()
            .find(|lang| lang.is_default)
            .unwrap_or(&self.languages[0])
    }

    /// Check if a language code is registered and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }
}

/// Languages with translation files under `translations/`.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_default: true,
            enabled: true,
        },
        LanguageConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            is_default: false,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_german() {
        let config = LanguageRegistry::get()
            .get_by_code("de")
            .expect("German should be registered");

        assert_eq!(config.name, "German");
        assert_eq!(config.native_name, "Deutsch");
        assert!(!config.is_default);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_is_exact() {
        let registry = LanguageRegistry::get();
        assert!(registry.get_by_code("de-DE").is_none());
        assert!(registry.get_by_code("EN").is_none());
        assert!(registry.get_by_code("fr").is_none());
    }

    #[test]
    fn test_list_enabled_contains_english_and_german() {
        let enabled = LanguageRegistry::get().list_enabled();

        assert_eq!(enabled.len(), 2);
        assert!(enabled.iter().any(|lang| lang.code == "en"));
        assert!(enabled.iter().any(|lang| lang.code == "de"));
    }

    #[test]
    fn test_default_language_is_english() {
        let default = LanguageRegistry::get().default_language();
        assert_eq!(default.code, "en");
        assert!(default.is_default);
    }

    #[test]
    fn test_is_enabled() {
        let registry = LanguageRegistry::get();
        assert!(registry.is_enabled("en"));
        assert!(registry.is_enabled("de"));
        assert!(!registry.is_enabled("fr"));
    }
}
