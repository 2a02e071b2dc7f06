//! HTTP client with request pacing and retry on transient failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

use corpus::BackendError;

/// Default user agent when none is configured.
pub const USER_AGENT: &str = concat!("corpus/", env!("CARGO_PKG_VERSION"), " (text collection)");

/// Base delay for retry backoff.
const BACKOFF_BASE_MS: u64 = 500;

/// Exponential backoff: `base_ms * 2^attempt`, capped at one minute.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(60_000))
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to create HTTP client: {0}")]
    Build(String),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<HttpError> for BackendError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { .. } | HttpError::Decode { .. } => {
                BackendError::Upstream(err.to_string())
            }
            HttpError::Build(_) | HttpError::Request { .. } => {
                BackendError::Request(err.to_string())
            }
        }
    }
}

/// HTTP client shared by one backend's requests.
///
/// Consecutive requests are spaced by at least `request_delay`. Timeouts
/// and connection errors are retried up to `max_retries` times with
/// exponential backoff; HTTP error statuses are returned immediately.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    service: String,
    request_delay: Duration,
    max_retries: u32,
    last_request: Arc<Mutex<Option<Instant>>>,
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    service: String,
    timeout: Duration,
    request_delay: Duration,
    user_agent: Option<String>,
    bearer_token: Option<String>,
    max_retries: u32,
}

impl HttpClientBuilder {
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpError> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| HttpError::Build(format!("Invalid bearer token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT))
            .timeout(self.timeout)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(HttpClient {
            client,
            service: self.service,
            request_delay: self.request_delay,
            max_retries: self.max_retries,
            last_request: Arc::new(Mutex::new(None)),
        })
    }
}

impl HttpClient {
    /// Create a builder.
    ///
    /// - `service`: name used in log lines
    /// - `timeout`: per-request timeout
    /// - `request_delay`: minimum gap between requests
    pub fn builder(service: &str, timeout: Duration, request_delay: Duration) -> HttpClientBuilder {
        HttpClientBuilder {
            service: service.to_string(),
            timeout,
            request_delay,
            user_agent: None,
            bearer_token: None,
            max_retries: 0,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let response = self.get(url, &[]).await?;
        response.text().await.map_err(|source| HttpError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, HttpError> {
        let response = self.get(url, query).await?;
        response.json().await.map_err(|source| HttpError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response, HttpError> {
        let mut attempt = 0;
        loop {
            self.wait_for_slot().await;
            tracing::debug!("[{}] GET {}", self.service, url);

            match self.client.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(HttpError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    return Ok(response);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt, BACKOFF_BASE_MS);
                    attempt += 1;
                    tracing::warn!(
                        "[{}] {} failed ({}), retry {}/{} in {:?}",
                        self.service,
                        url,
                        e,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    return Err(HttpError::Request {
                        url: url.to_string(),
                        source,
                    })
                }
            }
        }
    }

    /// Sleep until `request_delay` has passed since the previous request.
    async fn wait_for_slot(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_delay {
                tokio::time::sleep(self.request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
