//! Error classification for outbound calls.
//!
//! Every failure is folded into one `ApiError` kind at the transport boundary.
//! The kind drives the retry decision; `user_message()` derives the single
//! ready-to-display string callers are allowed to show.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Which transient network fault terminated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    ConnectionRefused,
    ConnectionReset,
    Timeout,
}

/// Classified failure for every outbound call.
///
/// `RateLimited`, `Server`, and `Transient` are retryable; everything else
/// propagates on first occurrence.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// HTTP 429, optionally carrying the server-advised `retry-after` delay.
    #[error("rate limited by the server")]
    RateLimited {
        retry_after: Option<Duration>,
        message: Option<String>,
    },

    /// HTTP 5xx.
    #[error("server error (status {status})")]
    Server { status: u16, message: Option<String> },

    /// Connection refused / reset / request timeout.
    #[error("transient network fault: {detail}")]
    Transient { kind: FaultKind, detail: String },

    /// 4xx other than 429 — bad format, payload too large, validation failure.
    #[error("request rejected (status {status})")]
    Client { status: u16, message: Option<String> },

    /// The request produced no response at all.
    #[error("no response from the server: {detail}")]
    NoResponse { detail: String },

    /// Anything that resists classification.
    #[error("unclassified error: {0}")]
    Unclassified(String),
}

impl ApiError {
    /// Classifies a non-success HTTP status plus whatever the backend sent
    /// alongside it.
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        let message = backend_message(body);
        match status {
            429 => ApiError::RateLimited {
                retry_after,
                message,
            },
            s if s >= 500 => ApiError::Server { status, message },
            _ => ApiError::Client { status, message },
        }
    }

    /// Whether the retry policy may re-execute the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. } | ApiError::Server { .. } | ApiError::Transient { .. }
        )
    }

    /// Server-advised wait, when one accompanied the failure.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Derives the human-readable message shown to the user.
    ///
    /// Status-specific wording wins for 429 / 413 / 400 / 5xx and for the
    /// network fault kinds; otherwise the backend-provided message is used,
    /// then the transport detail, then a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::RateLimited { retry_after, .. } => match retry_after {
                Some(wait) => format!(
                    "The server is busy. Please try again in {} seconds.",
                    wait.as_secs()
                ),
                None => "The server is busy. Please try again in a moment.".to_string(),
            },
            ApiError::Client { status: 413, .. } => {
                "The file is too large for the server to accept. Please upload a smaller file."
                    .to_string()
            }
            ApiError::Client { status: 400, .. } => {
                "The file format was not accepted. Please upload a PDF or DOCX file.".to_string()
            }
            ApiError::Client {
                message: Some(msg), ..
            } => msg.clone(),
            ApiError::Client { status, .. } => {
                format!("The request was rejected (status {status}).")
            }
            ApiError::Server { .. } => {
                "The service is temporarily unavailable. Please try again shortly.".to_string()
            }
            ApiError::Transient { kind, .. } => match kind {
                FaultKind::ConnectionRefused => {
                    "Could not reach the server. Make sure the backend is running and check your connection."
                        .to_string()
                }
                FaultKind::Timeout => {
                    "The request timed out. Try again with a smaller file or a better connection."
                        .to_string()
                }
                FaultKind::ConnectionReset => {
                    "The connection was interrupted. Please try again.".to_string()
                }
            },
            ApiError::NoResponse { .. } => {
                "Network error: no response from the server.".to_string()
            }
            ApiError::Unclassified(msg) if !msg.is_empty() => msg.clone(),
            ApiError::Unclassified(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Transient {
                kind: FaultKind::Timeout,
                detail: err.to_string(),
            }
        } else if err.is_connect() {
            ApiError::Transient {
                kind: FaultKind::ConnectionRefused,
                detail: err.to_string(),
            }
        } else if err.is_request() || err.is_body() {
            ApiError::NoResponse {
                detail: err.to_string(),
            }
        } else {
            ApiError::Unclassified(err.to_string())
        }
    }
}

/// Pulls the backend's own message out of an error body, preferring the
/// `message` field over `error`. Non-JSON bodies yield nothing.
fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.get("error").and_then(Value::as_str))
        .map(str::to_string)
}
