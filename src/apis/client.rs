/// Base HTTP client shared by API implementations.
use reqwest::Client;
use std::time::Duration;

use crate::errors::{TrackerError, TrackerResult};

/// Thin wrapper around a reqwest [`Client`] with a construction-time
/// timeout. One instance per API client; reqwest pools connections
/// internally.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> TrackerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TrackerError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
