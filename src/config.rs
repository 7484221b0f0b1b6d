use crate::datasource::stockdata::{HttpSettings, DEFAULT_STOCKDATA_URL};
use crate::domain::{ReferenceClock, DEFAULT_REFERENCE_UTC_OFFSET_HOURS};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_KEYS_FILE: &str = "api_credentials/keys.txt";

#[derive(Debug, Clone)]
pub struct Config {
    pub stockdata_api_url: String,
    /// Token from the environment; takes precedence over the keys file.
    pub stockdata_api_token: Option<String>,
    pub api_keys_file: PathBuf,
    pub reference_utc_offset_hours: i32,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub persist_each_row: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stockdata_api_url: DEFAULT_STOCKDATA_URL.to_string(),
            stockdata_api_token: None,
            api_keys_file: PathBuf::from(DEFAULT_KEYS_FILE),
            reference_utc_offset_hours: DEFAULT_REFERENCE_UTC_OFFSET_HOURS,
            http_timeout_secs: 30,
            http_max_retries: 3,
            persist_each_row: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let stockdata_api_url = env_map
            .get("STOCKDATA_API_URL")
            .cloned()
            .unwrap_or(defaults.stockdata_api_url);

        let stockdata_api_token = env_map
            .get("STOCKDATA_API_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let api_keys_file = env_map
            .get("API_KEYS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.api_keys_file);

        let reference_utc_offset_hours = match env_map.get("REFERENCE_UTC_OFFSET_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|hours| ReferenceClock::from_offset_hours(*hours).is_some())
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "REFERENCE_UTC_OFFSET_HOURS".to_string(),
                        "must be whole hours between -23 and 23".to_string(),
                    )
                })?,
            None => defaults.reference_utc_offset_hours,
        };

        let http_timeout_secs = env_map
            .get("HTTP_TIMEOUT_SECS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "HTTP_TIMEOUT_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let http_max_retries = env_map
            .get("HTTP_MAX_RETRIES")
            .map(|s| s.as_str())
            .unwrap_or("3")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "HTTP_MAX_RETRIES".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;

        let persist_each_row = match env_map
            .get("PERSIST_EACH_ROW")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
            .unwrap_or("false")
        {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "PERSIST_EACH_ROW".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            stockdata_api_url,
            stockdata_api_token,
            api_keys_file,
            reference_utc_offset_hours,
            http_timeout_secs,
            http_max_retries,
            persist_each_row,
        })
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http_timeout_secs),
            max_retries: self.http_max_retries,
        }
    }

    pub fn reference_clock(&self) -> ReferenceClock {
        ReferenceClock::from_offset_hours(self.reference_utc_offset_hours).unwrap_or_default()
    }
}
