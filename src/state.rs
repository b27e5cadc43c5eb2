use std::sync::Arc;

use crate::i18n::{LanguageCode, TranslationMap};

/// Published translation state.
///
/// Cloning is cheap: the translation map is shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationState {
    /// Current language; `None` until the first configure publishes
    pub language: Option<LanguageCode>,

    /// Translations for `language`
    pub translations: Arc<TranslationMap>,

    /// Set once on the first publish and never reset
    pub initialized: bool,
}

impl TranslationState {
    /// Look up `key`, returning the key itself when there is no translation.
    ///
    /// Empty translations count as missing so rendered text is never blank.
    pub fn translate(&self, key: &str) -> String {
        self.translations
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
