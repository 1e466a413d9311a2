//! LLM HTTP Client
//!
//! Reusable HTTP client for LLM APIs with a request timeout and optional
//! exponential-backoff retry (disabled unless configured).

use crate::error::{QueryForgeError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Default maximum number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default initial retry delay in milliseconds
const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

/// Default timeout for HTTP requests (in seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// HTTP client for LLM API requests
#[derive(Clone)]
pub struct LLMHttpClient {
    client: Client,
    max_retries: u32,
    initial_delay_ms: u64,
}

impl LLMHttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial retry delay
    pub fn with_retry_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    /// POST a JSON body and return the response text
    ///
    /// `provider` is only used to label errors.
    pub async fn post_json<T: Serialize>(
        &self,
        provider: &str,
        url: &str,
        headers: HeaderMap,
        body: &T,
    ) -> Result<String> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(url)
                .headers(headers.clone())
                .json(body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response.text().await?);
            }

            if self.should_retry(status, attempt) {
                let delay = self.calculate_delay(attempt);
                warn!(provider, %status, attempt, delay_ms = delay, "retrying LLM request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
                continue;
            }

            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());

            return Err(QueryForgeError::LLMApiError {
                provider: provider.to_string(),
                message,
                status: status.as_u16(),
            });
        }
    }

    /// Check if a request should be retried
    fn should_retry(&self, status: StatusCode, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
            || status.is_server_error()
    }

    /// Calculate retry delay with exponential backoff
    fn calculate_delay(&self, attempt: u32) -> u64 {
        self.initial_delay_ms * 2_u64.pow(attempt)
    }

    /// Build standard bearer-token headers for API requests
    pub fn build_headers(api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| QueryForgeError::Config("API key contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = LLMHttpClient::new().unwrap();
        assert_eq!(client.max_retries, 0);
    }

    #[test]
    fn test_no_retry_by_default() {
        let client = LLMHttpClient::with_timeout(30).unwrap();
        assert!(!client.should_retry(StatusCode::INTERNAL_SERVER_ERROR, 0));
        assert!(!client.should_retry(StatusCode::TOO_MANY_REQUESTS, 0));
    }

    #[test]
    fn test_retry_logic() {
        let client = LLMHttpClient::new().unwrap().with_max_retries(3);

        assert!(client.should_retry(StatusCode::INTERNAL_SERVER_ERROR, 0));
        assert!(client.should_retry(StatusCode::SERVICE_UNAVAILABLE, 0));
        assert!(client.should_retry(StatusCode::TOO_MANY_REQUESTS, 0));

        assert!(!client.should_retry(StatusCode::BAD_REQUEST, 0));
        assert!(!client.should_retry(StatusCode::UNAUTHORIZED, 0));

        assert!(!client.should_retry(StatusCode::INTERNAL_SERVER_ERROR, 3));
    }

    #[test]
    fn test_exponential_backoff() {
        let client = LLMHttpClient::new().unwrap().with_retry_delay(500);

        assert_eq!(client.calculate_delay(0), 500);
        assert_eq!(client.calculate_delay(1), 1000);
        assert_eq!(client.calculate_delay(2), 2000);
    }

    #[test]
    fn test_headers_building() {
        let headers = LLMHttpClient::build_headers("test-key").unwrap();
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer test-key");

        assert!(LLMHttpClient::build_headers("bad\nkey").is_err());
    }
}
