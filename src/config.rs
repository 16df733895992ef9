use crate::i18n::Language;
use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    // Remote translation provider
    pub translation_api_url: String,
    pub translation_api_key: String,
    pub translation_model: String,
    pub translation_timeout_secs: u64,

    // Persistence
    pub store_path: String,

    // Localization
    pub default_language: Language,
    pub cache_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            translation_api_url: DEFAULT_API_URL.to_string(),
            translation_api_key: String::new(),
            translation_model: DEFAULT_MODEL.to_string(),
            translation_timeout_secs: 15,
            store_path: "localization_store.json".to_string(),
            default_language: Language::canonical(),
            cache_ttl_days: 7,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_language = match std::env::var("DEFAULT_LANGUAGE") {
            Ok(code) => Language::from_code(code.trim())
                .with_context(|| format!("DEFAULT_LANGUAGE '{}' is not usable", code))?,
            Err(_) => defaults.default_language,
        };

        Ok(Self {
            // Remote translation provider
            translation_api_url: std::env::var("TRANSLATION_API_URL")
                .unwrap_or(defaults.translation_api_url),
            translation_api_key: std::env::var("TRANSLATION_API_KEY")
                .context("TRANSLATION_API_KEY not set")?,
            translation_model: std::env::var("TRANSLATION_MODEL")
                .unwrap_or(defaults.translation_model),
            translation_timeout_secs: std::env::var("TRANSLATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.translation_timeout_secs),

            // Persistence
            store_path: std::env::var("LOCALIZATION_STORE_PATH").unwrap_or(defaults.store_path),

            // Localization
            default_language,
            cache_ttl_days: std::env::var("TRANSLATION_CACHE_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|days: &i64| *days > 0)
                .unwrap_or(defaults.cache_ttl_days),
        })
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.cache_ttl_days)
    }
}
