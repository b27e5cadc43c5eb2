// Library exports for integration tests and binaries

pub mod config;
pub mod i18n;
pub mod manager;
pub mod provider;
pub mod retry;
pub mod state;
pub mod storage;
pub mod subscription;

pub use manager::{I18n, I18nOptions, ManagerSettings};
pub use state::TranslationState;
