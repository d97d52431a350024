//! Client configuration loaded from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};

/// Endpoint used when `JOBMATCH_API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;

/// Connection configuration shared by every outbound call.
///
/// Read once at startup; the transport holds a copy, so changes apply
/// uniformly to all operations.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Default per-request timeout.
    pub request_timeout: Duration,
    /// Extended timeout for resume uploads, sized for backend cold starts.
    pub upload_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(ClientConfig {
            base_url: std::env::var("JOBMATCH_API_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            request_timeout: env_secs(
                "JOBMATCH_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            upload_timeout: env_secs("JOBMATCH_UPLOAD_TIMEOUT_SECS", DEFAULT_UPLOAD_TIMEOUT_SECS)?,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
        }
    }
}

fn env_secs(key: &str, default: u64) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("'{key}' must be a whole number of seconds")),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}
