//! Configuration and settings management
//!
//! Loads settings from environment variables and optional config files.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Channel handle to scan (`@username` or numeric chat id)
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Maximum number of messages examined per run
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,

    /// Path of the ledger file
    #[serde(default = "default_lessons_file")]
    pub lessons_file: String,

    /// R2 Storage access key ID
    pub r2_access_key_id: Option<String>,
    /// R2 Storage secret access key
    pub r2_secret_access_key: Option<String>,
    /// R2 Storage endpoint URL
    pub r2_endpoint_url: Option<String>,
    /// R2 Storage bucket name
    pub r2_bucket_name: Option<String>,
    /// Key prefix for audio objects within the bucket
    pub r2_prefix: Option<String>,
    /// Public base URL that audio links are built from
    pub r2_public_base_url: Option<String>,
}

fn default_channel() -> String {
    "@D_faisl".to_string()
}

const fn default_scan_limit() -> usize {
    100
}

fn default_lessons_file() -> String {
    "lessons.json".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Fallback: check environment variables directly if config didn't
        // pick them up
        env_fallback(&mut settings.r2_access_key_id, "R2_ACCESS_KEY_ID");
        env_fallback(&mut settings.r2_secret_access_key, "R2_SECRET_ACCESS_KEY");
        env_fallback(&mut settings.r2_endpoint_url, "R2_ENDPOINT_URL");
        env_fallback(&mut settings.r2_bucket_name, "R2_BUCKET_NAME");
        env_fallback(&mut settings.r2_prefix, "R2_PREFIX");
        env_fallback(&mut settings.r2_public_base_url, "R2_PUBLIC_BASE_URL");

        Ok(settings)
    }
}

/// Fill an unset option from an environment variable, ignoring empty values
fn env_fallback(slot: &mut Option<String>, var: &str) {
    if slot.is_none() {
        if let Ok(val) = std::env::var(var) {
            if !val.is_empty() {
                *slot = Some(val);
            }
        }
    }
}
