//! Transport — the single configured HTTP client every outbound call goes
//! through.
//!
//! Holds the base URL, default timeout, and default headers; classifies
//! transport and status failures into `ApiError`. No retry or business logic
//! lives here.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Request/response middleware. Passed into the transport constructor so
/// observation is explicit and isolated per instance, never global state.
pub trait TransportHooks: Send + Sync {
    fn on_request(&self, method: &str, url: &str);
    fn on_response(&self, method: &str, url: &str, status: u16);
}

/// Default hooks: structured logging via `tracing`.
pub struct TracingHooks;

impl TransportHooks for TracingHooks {
    fn on_request(&self, method: &str, url: &str) {
        debug!(method, url, "sending request");
    }

    fn on_response(&self, method: &str, url: &str, status: u16) {
        debug!(method, url, status, "response received");
    }
}

#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    hooks: Arc<dyn TransportHooks>,
}

impl Transport {
    pub fn new(config: &ClientConfig, hooks: Arc<dyn TransportHooks>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Unclassified(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            hooks,
        })
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path);
        self.hooks.on_request("GET", &url);
        let response = self.client.get(&url).send().await.map_err(ApiError::from)?;
        self.decode("GET", &url, response).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        self.hooks.on_request("POST", &url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;
        self.decode("POST", &url, response).await
    }

    /// Multipart POST with a per-request timeout override. reqwest sets the
    /// multipart content-type itself, overriding the JSON default header.
    pub async fn post_multipart(
        &self,
        path: &str,
        form: Form,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        self.hooks.on_request("POST", &url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(ApiError::from)?;
        self.decode("POST", &url, response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode(
        &self,
        method: &str,
        url: &str,
        response: Response,
    ) -> Result<Value, ApiError> {
        let status = response.status();
        self.hooks.on_response(method, url, status.as_u16());

        if status.is_success() {
            return response.json::<Value>().await.map_err(ApiError::from);
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status.as_u16(), retry_after, &body))
    }
}

/// `retry-after` in whole seconds; date-form values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_header_parsed_as_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_or_date_form_retry_after_yields_none() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = ClientConfig {
            base_url: "http://localhost:5000/api/".to_string(),
            ..ClientConfig::default()
        };
        let transport = Transport::new(&config, Arc::new(TracingHooks)).unwrap();
        assert_eq!(transport.url("/health"), "http://localhost:5000/api/health");
    }
}
