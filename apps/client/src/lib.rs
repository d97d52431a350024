//! HTTP client core for the jobmatch resume-analysis backend.
//!
//! Composes a configured transport, a classification-driven retry/backoff
//! policy, and a shape-tolerant response normalizer behind three operations:
//! [`ApiService::upload_resume`], [`ApiService::check_health`], and
//! [`ApiService::get_job_recommendations`].

pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod retry;
pub mod service;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ApiError, FaultKind};
pub use models::{HealthStatus, Preferences, RecommendationRequest, UploadFile};
pub use normalize::{normalize, JobMatch, NormalizedResult};
pub use retry::RetryPolicy;
pub use service::ApiService;
pub use transport::{TracingHooks, Transport, TransportHooks};
