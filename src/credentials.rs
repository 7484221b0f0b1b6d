//! API credentials loaded from a keys file.
//!
//! The keys file holds one entry per line in the form `'Service Name': KEY`.
//! Credentials are an explicit value owned by the caller and handed to the
//! price source; there is no global key store.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const STOCKDATA_SERVICE: &str = "StockData.org";
pub const ALPHA_VANTAGE_SERVICE: &str = "Alpha Vantage";
pub const FINNHUB_SERVICE: &str = "Finnhub";

const KEY_PATTERN: &str = r"'([^']+)':\s*([A-Za-z0-9]+)";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read keys file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// API keys by service name.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiCredentials {
    keys: BTreeMap<String, String>,
}

// Keys never reach logs.
impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("services", &self.services())
            .finish()
    }
}

impl ApiCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, service: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(service.into(), key.into());
        self
    }

    /// Parse keys file contents. Lines that do not match are ignored.
    pub fn parse(content: &str) -> Self {
        let Ok(pattern) = Regex::new(KEY_PATTERN) else {
            return Self::default();
        };
        let mut keys = BTreeMap::new();
        for caps in pattern.captures_iter(content) {
            let service = caps[1].to_string();
            debug!("Loaded API key for {}", service);
            keys.insert(service, caps[2].to_string());
        }
        Self { keys }
    }

    /// Read and parse a keys file.
    pub fn from_keys_file(path: &Path) -> Result<Self, CredentialsError> {
        let content = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let creds = Self::parse(&content);
        info!("Loaded {} API keys from {}", creds.keys.len(), path.display());
        Ok(creds)
    }

    /// Load credentials for a run.
    ///
    /// A missing or unreadable keys file is reported and yields empty
    /// credentials. `env_token`, when set, overrides the StockData.org key.
    pub fn load(path: &Path, env_token: Option<String>) -> Self {
        let mut creds = match Self::from_keys_file(path) {
            Ok(creds) => creds,
            Err(e) => {
                warn!("{}", e);
                Self::new()
            }
        };
        if let Some(token) = env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            creds.keys.insert(STOCKDATA_SERVICE.to_string(), token);
        }
        creds
    }

    pub fn get(&self, service: &str) -> Option<&str> {
        self.keys.get(service).map(String::as_str)
    }

    pub fn has_key(&self, service: &str) -> bool {
        self.keys.contains_key(service)
    }

    pub fn stockdata_token(&self) -> Option<&str> {
        self.get(STOCKDATA_SERVICE)
    }

    pub fn services(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }
}
