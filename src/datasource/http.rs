//! JSON over HTTP with retry/backoff and a hard per-call timeout.

use super::DataSourceError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// Shared HTTP client for every remote collaborator.
///
/// Transient failures (network errors, 429, 5xx) are retried with exponential
/// backoff; the whole call, retries included, is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct JsonHttpClient {
    client: Client,
    timeout: Duration,
}

impl JsonHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, DataSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataSourceError::Other(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, DataSourceError> {
        debug!(url, "GET");
        self.send_with_retry(|| self.client.get(url)).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, DataSourceError> {
        debug!(url, "POST");
        self.send_with_retry(|| self.client.post(url).json(payload))
            .await
    }

    async fn send_with_retry<F>(&self, request: F) -> Result<serde_json::Value, DataSourceError>
    where
        F: Fn() -> RequestBuilder,
    {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.timeout),
            ..Default::default()
        };

        let attempts = retry(backoff, || async {
            let response = request().send().await.map_err(|e| {
                backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        });

        tokio::time::timeout(self.timeout, attempts)
            .await
            .map_err(|_| DataSourceError::Timeout {
                secs: self.timeout.as_secs(),
            })?
    }
}
