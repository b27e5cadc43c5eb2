//! Language metadata shared by the translation state manager.
//!
//! # Architecture
//!
//! - `language`: `LanguageCode` and `TranslationMap`
//! - `registry`: languages the bundled translation files cover
//! - `resolver`: initial language selection (explicit > last used > environment)
//! - `metrics`: cache and fetch counters
//!
//! # Example
//!
//! ```rust
//! use translation_state::i18n::{resolve, LanguageCode};
//!
//! let english = LanguageCode::from("en");
//! let german = LanguageCode::from("de");
//!
//! assert_eq!(resolve(None, Some(&german), &english), german);
//! ```

mod language;
mod metrics;
mod registry;
mod resolver;

pub use language::{LanguageCode, TranslationMap};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use resolver::{detect_environment_language, environment_language_or, resolve};
