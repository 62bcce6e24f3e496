//! Rate-limited HTTP wrapper for SEC endpoints
//!
//! `get` retries on 429/503 and transport failures with exponential backoff.
//! Any other status is handed back to the caller to inspect. Exhausting the
//! attempts always yields [`AnalystError::Transport`].

use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-success status into an error
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AnalystError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// GET capability used by every SEC component
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch a URL
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production client: reqwest + governor quota + retry policy
pub struct SecHttpClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
    retry: RetryPolicy,
}

impl SecHttpClient {
    /// Create a client from configuration
    pub fn new(config: &AnalystConfig) -> Result<Self> {
        if config.sec_user_agent.is_none() {
            warn!("SEC_USER_AGENT not set; SEC may reject requests without a contact address");
        }

        let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            AnalystError::Config("requests_per_second must be greater than 0".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        let client = Client::builder()
            .user_agent(config.user_agent())
            .timeout(config.metadata_timeout)
            .build()
            .map_err(|e| AnalystError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            rate_limiter,
            retry: config.retry_policy(),
        })
    }

    async fn get_once(&self, url: &str) -> Result<HttpResponse> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalystError::Transport(format!("GET {url} failed: {e}")))?;

        let status = response.status().as_u16();
        if is_retryable_status(status) {
            return Err(AnalystError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AnalystError::Transport(format!("reading body of {url} failed: {e}")))?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl HttpFetch for SecHttpClient {
    #[instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.retry
            .execute(url, is_retryable, || self.get_once(url))
            .await
            .map_err(|e| match e {
                AnalystError::Status { url, status } => AnalystError::Transport(format!(
                    "retries exhausted for {url}: last status {status}"
                )),
                other => other,
            })
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 503)
}

fn is_retryable(error: &AnalystError) -> bool {
    match error {
        AnalystError::Transport(_) => true,
        AnalystError::Status { status, .. } => is_retryable_status(*status),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::new(200, r#"{"cik": 320193}"#);
        assert!(response.is_success());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["cik"], 320_193);

        let missing = HttpResponse::new(404, "not found");
        assert!(matches!(
            missing.error_for_status("https://data.sec.gov/x"),
            Err(AnalystError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_retry_classification() {
        assert!(is_retryable(&AnalystError::Transport("reset".into())));
        assert!(is_retryable(&AnalystError::Status {
            url: String::new(),
            status: 429
        }));
        assert!(is_retryable(&AnalystError::Status {
            url: String::new(),
            status: 503
        }));
        assert!(!is_retryable(&AnalystError::Status {
            url: String::new(),
            status: 404
        }));
        assert!(!is_retryable(&AnalystError::Config("x".into())));
    }

    #[test]
    fn test_client_creation_without_user_agent() {
        let config = AnalystConfig::default();
        assert!(SecHttpClient::new(&config).is_ok());
    }
}
