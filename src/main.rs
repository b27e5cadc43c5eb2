//! Translation state demo binary
//!
//! Usage:
//!   translation-state                      # Print every bundled key in the startup language
//!   translation-state app.name routes.home # Print only the given keys
//!
//! Optional environment variables:
//! - I18N_LANGUAGE (explicit startup language)
//! - I18N_CACHE (defaults to true)
//! - I18N_SWITCH_TO (language to switch to after startup)
//! - I18N_STORAGE_DIR (defaults to .i18n)
//! - I18N_TRANSLATIONS_URL or I18N_TRANSLATIONS_DIR (defaults to bundled translations)
//! - I18N_DEFAULT_LANGUAGE (defaults to en)
//! - I18N_FETCH_TIMEOUT_SECS (defaults to 10, 0 disables)

use anyhow::Result;
use tracing::{info, warn};
use translation_state::config::Config;
use translation_state::i18n::LanguageRegistry;
use translation_state::I18n;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_state=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!("Using provider {:?}, storage in {}", config.provider, config.storage_dir.display());

    let i18n = I18n::new(
        config.translation_provider()?,
        config.storage(),
        config.manager_settings(),
    );

    let _subscription = i18n.subscribe(|state| {
        if let Some(language) = &state.language {
            info!("Translations changed: {} ({} keys)", language, state.translations.len());
        }
    });

    i18n.configure(config.options()).await;

    let keys: Vec<String> = {
        let requested: Vec<String> = std::env::args().skip(1).collect();
        if requested.is_empty() {
            let mut all: Vec<String> = i18n.state().translations.keys().cloned().collect();
            all.sort();
            all
        } else {
            requested
        }
    };

    print_translations(&i18n, &keys);

    if let Some(target) = &config.switch_to {
        if !LanguageRegistry::get().is_enabled(target.as_str()) {
            warn!(
                "{} has no bundled translations, the provider decides what to serve",
                target
            );
        }
        i18n.switch_language(target.clone()).await;
        print_translations(&i18n, &keys);
    }

    i18n.wait_for_revalidation().await;

    let available: Vec<String> = LanguageRegistry::get()
        .list_enabled()
        .iter()
        .map(|lang| format!("{} ({})", lang.code, lang.native_name))
        .collect();
    info!("Bundled languages: {}", available.join(", "));
    info!("Metrics: {}", serde_json::to_string(&i18n.metrics())?);

    Ok(())
}

fn print_translations(i18n: &I18n, keys: &[String]) {
    match i18n.language() {
        Some(code) => match LanguageRegistry::get().get_by_code(code.as_str()) {
            Some(lang) => println!("[{}] {}", code, lang.name),
            None => println!("[{}]", code),
        },
        None => println!("[-]"),
    }

    for key in keys {
        println!("{} = {}", key, i18n.translate(key));
    }
}
