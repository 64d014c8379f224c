//! Data models and structures
//!
//! Defines the work items flowing through the upload pipeline, the options
//! controlling one run, and the configuration for the storage and CDN APIs.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ZONE_HOST: &str = "sg.storage.bunnycdn.com";
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// One file queued for upload: where it lives locally and where it goes remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub absolute_path: PathBuf,
    /// Path relative to the walked root, always `/`-separated.
    pub relative_path: String,
}

/// Final outcome of one item after the retry policy has run.
#[derive(Debug)]
pub enum UploadOutcome {
    Success,
    /// Every attempt failed; carries the last cause.
    TransientFailure(Error),
    /// The item could not be attempted at all.
    FatalFailure(Error),
    Canceled,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success)
    }
}

/// Options for one folder upload run.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub concurrency: usize,
    pub attempt_timeout: Duration,
    pub max_attempts: usize,
    pub retry_delay: Duration,
    pub fail_fast: bool,
}

impl UploadOptions {
    pub fn new(concurrency: usize, attempt_timeout: Duration, fail_fast: bool) -> Self {
        Self {
            concurrency,
            attempt_timeout,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            fail_fast,
        }
    }

    pub fn with_retry(mut self, max_attempts: usize, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.attempt_timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(10), true)
    }
}

/// Aggregate result of a successful run.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub files_uploaded: usize,
    pub elapsed: Duration,
}

// Configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key: String,
    pub zone_name: String,
    pub zone_host: String,
}

impl StorageConfig {
    pub fn new(access_key: String, zone_name: String) -> Self {
        Self {
            access_key,
            zone_name,
            zone_host: DEFAULT_ZONE_HOST.to_string(),
        }
    }

    pub fn with_zone_host(mut self, zone_host: String) -> Self {
        self.zone_host = zone_host;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_key.trim().is_empty() {
            return Err(Error::Config("storage access key is empty".to_string()));
        }
        if self.zone_name.trim().is_empty() {
            return Err(Error::Config("storage zone name is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CdnConfig {
    pub api_key: String,
}

impl CdnConfig {
    /// Resolve the account API key from an explicit value, falling back to
    /// `BUNNYCDN_API_KEY` (a `.env` file is loaded first when present).
    pub fn resolve(api_key: Option<String>) -> Result<Self> {
        match api_key.filter(|key| !key.trim().is_empty()) {
            Some(api_key) => Ok(Self { api_key }),
            None => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("BUNNYCDN_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("env BUNNYCDN_API_KEY is not set".to_string()))?;

        Ok(Self { api_key })
    }
}

/// Error body returned by the Bunny APIs.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(rename = "HttpCode")]
    pub http_code: Option<u16>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
}

/// Render a non-success reply body, preferring the API's `Message` field.
pub fn describe_error_body(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| body.trim().to_string())
}
