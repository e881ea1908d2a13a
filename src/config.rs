use crate::model::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Upper bound the pricing endpoint accepts per request.
pub const MAX_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub steam_id: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_cache_ttl() -> u64 {
    5 * 60
}

fn default_request_timeout() -> u64 {
    10
}

fn default_refresh_interval() -> u64 {
    5 * 60
}

impl AppConfig {
    /// Applies `WISHLIST_SNIPER_*` overrides from the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WISHLIST_SNIPER_API_URL") {
            self.api_base_url = url;
        }
        if let Some(id) = lookup("WISHLIST_SNIPER_STEAM_ID") {
            self.steam_id = Some(id);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base_url must not be empty".into()));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        Ok(())
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: AppConfig = serde_json::from_str(&content)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}
