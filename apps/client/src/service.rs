//! API service — the public surface composing transport, retry policy, and
//! response normalization.
//!
//! Each operation carries its own retry budget: uploads tolerate backend cold
//! starts with a long schedule, the health probe gives up quickly, and
//! recommendation fetches sit in between. Failures cross this boundary as
//! `ApiError`; callers display `user_message()` and nothing else.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{HealthStatus, RecommendationRequest, UploadFile};
use crate::normalize::{normalize, NormalizedResult};
use crate::retry::RetryPolicy;
use crate::transport::{TracingHooks, Transport, TransportHooks};

const UPLOAD_ATTEMPTS: u32 = 4;
const UPLOAD_BASE_DELAY: Duration = Duration::from_millis(3000);
const HEALTH_ATTEMPTS: u32 = 2;
const HEALTH_BASE_DELAY: Duration = Duration::from_millis(1000);
const RECOMMEND_ATTEMPTS: u32 = 3;
const RECOMMEND_BASE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Clone)]
pub struct ApiService {
    transport: Transport,
    upload_timeout: Duration,
    upload_policy: RetryPolicy,
    health_policy: RetryPolicy,
    recommend_policy: RetryPolicy,
}

impl ApiService {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_hooks(config, Arc::new(TracingHooks))
    }

    pub fn with_hooks(
        config: &ClientConfig,
        hooks: Arc<dyn TransportHooks>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            transport: Transport::new(config, hooks)?,
            upload_timeout: config.upload_timeout,
            upload_policy: RetryPolicy::new(UPLOAD_ATTEMPTS, UPLOAD_BASE_DELAY),
            health_policy: RetryPolicy::new(HEALTH_ATTEMPTS, HEALTH_BASE_DELAY),
            recommend_policy: RetryPolicy::new(RECOMMEND_ATTEMPTS, RECOMMEND_BASE_DELAY),
        })
    }

    /// Submits the resume as a multipart payload under field name `resume`
    /// and returns the normalized analysis result.
    ///
    /// The caller validates the file first; this method does not. The
    /// multipart body is rebuilt on every retry attempt.
    pub async fn upload_resume(&self, file: &UploadFile) -> Result<NormalizedResult, ApiError> {
        info!(
            name = %file.name,
            bytes = file.byte_size(),
            mime = %file.mime_type,
            "uploading resume"
        );

        let raw = self
            .upload_policy
            .execute(|| async {
                let form = Form::new().part("resume", multipart_part(file)?);
                self.transport
                    .post_multipart("/upload", form, self.upload_timeout)
                    .await
            })
            .await?;

        let result = normalize(&raw);
        info!(matches = result.matches.len(), "resume analysis complete");
        Ok(result)
    }

    /// Probes `/health`. Never fails: exhausting the short retry budget
    /// yields the degraded status value instead.
    pub async fn check_health(&self) -> HealthStatus {
        let outcome = self
            .health_policy
            .execute(|| async { self.transport.get_json("/health").await })
            .await;

        match outcome {
            Ok(raw) => HealthStatus::from_value(&raw),
            Err(err) => {
                warn!(error = %err, "health check failed");
                HealthStatus::degraded(&err)
            }
        }
    }

    /// Posts resume data and preferences, returning the normalized
    /// recommendation payload.
    pub async fn get_job_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<NormalizedResult, ApiError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::Unclassified(format!("failed to encode request: {e}")))?;

        let raw = self
            .recommend_policy
            .execute(|| async { self.transport.post_json("/recommendations", &body).await })
            .await?;

        Ok(normalize(&raw))
    }
}

fn multipart_part(file: &UploadFile) -> Result<Part, ApiError> {
    Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)
        .map_err(|e| ApiError::Unclassified(format!("invalid mime type '{}': {e}", file.mime_type)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Sleeper;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct NoopSleeper;

    #[async_trait]
    impl Sleeper for NoopSleeper {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn refused() -> ApiError {
        ApiError::Transient {
            kind: crate::error::FaultKind::ConnectionRefused,
            detail: "connection refused".to_string(),
        }
    }

    // Exercises the health budget exactly as check_health wires it: two
    // attempts total, then the degraded value.
    #[tokio::test]
    async fn test_health_budget_exhaustion_yields_degraded_status() {
        let policy =
            RetryPolicy::with_sleeper(HEALTH_ATTEMPTS, HEALTH_BASE_DELAY, Arc::new(NoopSleeper));
        let attempts = AtomicU32::new(0);

        let outcome: Result<serde_json::Value, _> = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(refused())
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        let status = match outcome {
            Ok(raw) => HealthStatus::from_value(&raw),
            Err(err) => HealthStatus::degraded(&err),
        };
        assert_eq!(status.status, "unhealthy");
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_health_recovers_within_budget() {
        let policy =
            RetryPolicy::with_sleeper(HEALTH_ATTEMPTS, HEALTH_BASE_DELAY, Arc::new(NoopSleeper));
        let attempts = AtomicU32::new(0);

        let outcome = policy
            .execute(|| async {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 {
                    Err(refused())
                } else {
                    Ok(serde_json::json!({"status": "healthy"}))
                }
            })
            .await;

        let status = match outcome {
            Ok(raw) => HealthStatus::from_value(&raw),
            Err(err) => HealthStatus::degraded(&err),
        };
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(status.is_healthy());
        assert!(status.error.is_none());
    }

    // End-to-end payload handling for a successful upload response.
    #[test]
    fn test_upload_payload_extraction_prefers_nested_results() {
        let raw = serde_json::json!({
            "success": true,
            "results": {
                "matches": [{"title": "Engineer", "company": "Acme"}],
                "resume_summary": "Strong backend skills"
            }
        });
        let result = normalize(&raw);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].title, "Engineer");
        assert_eq!(result.matches[0].company, "Acme");
        assert_eq!(result.matches[0].match_percentage, 0.0);
        assert_eq!(
            result.resume_summary.as_deref(),
            Some("Strong backend skills")
        );
    }

    #[test]
    fn test_multipart_part_rejects_malformed_mime() {
        let file = UploadFile::new("cv.pdf", vec![1, 2, 3], "not a mime type");
        assert!(multipart_part(&file).is_err());
    }

    #[test]
    fn test_multipart_part_accepts_allowed_types() {
        let file = UploadFile::new("cv.pdf", vec![1, 2, 3], "application/pdf");
        assert!(multipart_part(&file).is_ok());
    }
}
