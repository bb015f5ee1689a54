/// Runtime configuration loaded from an optional JSON file.
///
/// Every field has a default so the tracker runs with no config file at
/// all; a partial file overrides only the fields it names.
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::apis::coingecko::DEFAULT_TIMEOUT_SECS;
use crate::errors::{TrackerError, TrackerResult};

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL of the pricing API.
    pub base_url: String,
    /// How many markets one refresh pulls, ordered by market cap.
    pub per_page: u32,
    /// Quiet window for search input, in milliseconds.
    pub debounce_ms: u64,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Conversion pair preselected at startup.
    pub default_from: String,
    pub default_to: String,
    pub default_amount: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: 50,
            debounce_ms: 300,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_from: "bitcoin".to_string(),
            default_to: "ethereum".to_string(),
            default_amount: "1".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> TrackerResult<Self> {
        let raw = fs::read_to_string(&path)?;
        let config: TrackerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    /// A present but malformed file is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> TrackerResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> TrackerResult<()> {
        if self.base_url.is_empty() {
            return Err(TrackerError::Config("base_url must not be empty".into()));
        }
        if self.per_page == 0 {
            return Err(TrackerError::Config("per_page must be positive".into()));
        }
        Ok(())
    }
}
