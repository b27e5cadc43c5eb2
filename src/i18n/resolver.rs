//! Initial language resolution.
//!
//! Priority, first match wins:
//! 1. language passed explicitly by the caller
//! 2. last used language read from storage
//! 3. the environment's default locale
//!
//! The resolved code is not validated against the languages a provider
//! supports; providers decide what to do with codes they don't know.

use std::env;
use tracing::debug;

use crate::i18n::LanguageCode;

/// Pick the initial language.
pub fn resolve(
    explicit: Option<&LanguageCode>,
    last_used: Option<&LanguageCode>,
    environment_default: &LanguageCode,
) -> LanguageCode {
    if let Some(language) = explicit {
        debug!("I18N: Using explicitly set language: {}", language);
        return language.clone();
    }

    if let Some(language) = last_used {
        debug!("I18N: Using last used language: {}", language);
        return language.clone();
    }

    debug!("I18N: Using environment language: {}", environment_default);
    environment_default.clone()
}

/// Detect the process locale from `LC_ALL`, `LC_MESSAGES` and `LANG`, in that order.
///
/// Returns `None` when no variable holds a usable locale.
pub fn detect_environment_language() -> Option<LanguageCode> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var_name| env::var(var_name).ok())
        .find_map(|value| parse_locale_value(&value))
}

/// Detected environment language, or `fallback` when none is set.
pub fn environment_language_or(fallback: &LanguageCode) -> LanguageCode {
    detect_environment_language().unwrap_or_else(|| {
        debug!(
            "I18N: No locale in environment, using fallback: {}",
            fallback
        );
        fallback.clone()
    })
}

/// Turn a POSIX locale value like `de_DE.UTF-8@euro` into `de-DE`.
///
/// Only the encoding and modifier suffixes are stripped and `_` becomes `-`;
/// casing is left untouched. `C` and `POSIX` carry no language.
fn parse_locale_value(value: &str) -> Option<LanguageCode> {
    let trimmed = value.trim();
    let without_modifier = trimmed.split('@').next().unwrap_or(trimmed);
    let locale = without_modifier
        .split('.')
        .next()
        .unwrap_or(without_modifier);

    if locale.is_empty() || locale == "C" || locale == "POSIX" {
        return None;
    }

    Some(LanguageCode::new(locale.replace('_', "-")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn code(value: &str) -> LanguageCode {
        LanguageCode::from(value)
    }

    /// Run `f` with the locale variables set as given, restoring them afterwards.
    fn with_locale_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let names = ["LC_ALL", "LC_MESSAGES", "LANG"];
        let saved: Vec<(&str, Option<String>)> =
            names.iter().map(|n| (*n, env::var(n).ok())).collect();

        for name in names {
            env::remove_var(name);
        }
        for (name, value) in vars {
            if let Some(value) = value {
                env::set_var(name, value);
            }
        }

        f();

        for (name, value) in saved {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
    }

    // ==================== resolve Tests ====================

    #[test]
    fn test_explicit_language_wins() {
        let resolved = resolve(Some(&code("fr")), Some(&code("de")), &code("en"));
        assert_eq!(resolved, code("fr"));
    }

    #[test]
    fn test_last_used_wins_over_environment() {
        let resolved = resolve(None, Some(&code("de")), &code("en"));
        assert_eq!(resolved, code("de"));
    }

    #[test]
    fn test_environment_is_last_resort() {
        let resolved = resolve(None, None, &code("en"));
        assert_eq!(resolved, code("en"));
    }

    #[test]
    fn test_resolve_does_not_validate_codes() {
        let resolved = resolve(Some(&code("xx-YY")), None, &code("en"));
        assert_eq!(resolved, code("xx-YY"));
    }

    // ==================== Locale Parsing Tests ====================

    #[test]
    fn test_parse_locale_value() {
        assert_eq!(parse_locale_value("de_DE.UTF-8"), Some(code("de-DE")));
        assert_eq!(parse_locale_value("en_US.utf8"), Some(code("en-US")));
        assert_eq!(parse_locale_value("de_DE@euro"), Some(code("de-DE")));
        assert_eq!(parse_locale_value("fr"), Some(code("fr")));
    }

    #[test]
    fn test_parse_locale_value_keeps_casing() {
        assert_eq!(parse_locale_value("EN_us"), Some(code("EN-us")));
    }

    #[test]
    fn test_parse_locale_value_rejects_empty_and_posix() {
        assert_eq!(parse_locale_value(""), None);
        assert_eq!(parse_locale_value("   "), None);
        assert_eq!(parse_locale_value("C"), None);
        assert_eq!(parse_locale_value("C.UTF-8"), None);
        assert_eq!(parse_locale_value("POSIX"), None);
    }

    // ==================== Environment Detection Tests ====================

    #[test]
    #[serial]
    fn test_detect_uses_lang() {
        with_locale_env(&[("LANG", Some("de_DE.UTF-8"))], || {
            assert_eq!(detect_environment_language(), Some(code("de-DE")));
        });
    }

    #[test]
    #[serial]
    fn test_detect_lc_all_takes_priority() {
        with_locale_env(
            &[
                ("LC_ALL", Some("fr_FR.UTF-8")),
                ("LC_MESSAGES", Some("it_IT.UTF-8")),
                ("LANG", Some("de_DE.UTF-8")),
            ],
            || {
                assert_eq!(detect_environment_language(), Some(code("fr-FR")));
            },
        );
    }

    #[test]
    #[serial]
    fn test_detect_skips_posix_values() {
        with_locale_env(
            &[("LC_ALL", Some("C")), ("LANG", Some("de_DE.UTF-8"))],
            || {
                assert_eq!(detect_environment_language(), Some(code("de-DE")));
            },
        );
    }

    #[test]
    #[serial]
    fn test_environment_language_or_falls_back() {
        with_locale_env(&[], || {
            assert_eq!(detect_environment_language(), None);
            assert_eq!(environment_language_or(&code("en")), code("en"));
        });
    }
}
