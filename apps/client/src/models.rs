//! Request-side data models: the upload artifact, the health probe result,
//! and the recommendation request body.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Maximum accepted resume size.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// MIME types the backend accepts: PDF, DOCX, legacy DOC.
pub const ALLOWED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
];

/// A user-supplied resume file. Built once, validated once, never mutated.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Reads a file from disk, guessing the MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read resume file {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume")
            .to_string();
        let mime_type = guess_mime(path).to_string();
        Ok(Self::new(name, bytes, mime_type))
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Checks the MIME allow-list and the size ceiling.
    ///
    /// Callers run this before `upload_resume`; the service itself does not
    /// re-validate.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(ApiError::Client {
                status: 400,
                message: Some("Please upload a PDF or DOCX file".to_string()),
            });
        }
        if self.byte_size() > MAX_UPLOAD_BYTES {
            return Err(ApiError::Client {
                status: 413,
                message: Some("File size must be less than 5 MB".to_string()),
            });
        }
        Ok(())
    }
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("doc") => "application/msword",
        _ => "application/octet-stream",
    }
}

/// Outcome of the `/health` probe. `check_health` never fails; a terminal
/// error becomes the degraded value instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn from_value(raw: &Value) -> Self {
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        HealthStatus {
            status,
            error: None,
        }
    }

    pub fn degraded(err: &ApiError) -> Self {
        HealthStatus {
            status: "unhealthy".to_string(),
            error: Some(err.user_message()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of `POST /recommendations`.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationRequest {
    pub resume_data: Value,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<String>,
}
