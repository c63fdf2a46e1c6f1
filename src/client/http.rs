// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP client for the Databricks workspace REST API.
//!
//! This module provides a low-level HTTP client with:
//! - Connection pooling
//! - Automatic retry with exponential backoff
//! - Bearer token authentication
//! - JSON response decoding with workspace error mapping

use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Request, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    /// Whole-request timeout, including reading the body.
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
    /// Maximum number of idle connections kept per host.
    pub max_connections_per_host: usize,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            max_connections_per_host: 100,
            user_agent: format!("databricks-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Retry schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// Backoff before the retry that follows attempt `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Error body returned by the workspace REST API.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// The parts of a request needed to send it again.
struct Replayable {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl Replayable {
    fn capture(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(<[u8]>::to_vec),
        }
    }

    fn build(&self, client: &Client, authorization: &str) -> Result<Request> {
        let mut builder = client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .header(reqwest::header::AUTHORIZATION, authorization);
        if let Some(ref body) = self.body {
            builder = builder.body(body.clone());
        }
        builder
            .build()
            .map_err(|e| Error::api(None, format!("Failed to build request: {}", e)))
    }
}

/// HTTP client bound to one workspace credential.
///
/// Every request gets the provider's `Authorization` header. Transient
/// failures are retried per [`RetryPolicy`]; other non-success responses
/// become [`Error::NotFound`] (404) or [`Error::Api`].
#[derive(Debug)]
pub struct DatabricksHttpClient {
    client: Client,
    config: HttpClientConfig,
    auth_provider: Arc<dyn AuthProvider>,
}

impl DatabricksHttpClient {
    pub fn new(config: HttpClientConfig, auth_provider: Arc<dyn AuthProvider>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::api(None, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            auth_provider,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Request builder on the pooled client. Authentication is added by
    /// [`execute`](Self::execute), not here.
    pub fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    pub fn auth_header(&self) -> Result<String> {
        self.auth_provider.get_auth_header()
    }

    /// Sends a request, retrying on network errors and on 429, 502, 503
    /// and 504 responses.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let retry = self.config.retry;
        let replayable = Replayable::capture(&request);
        let authorization = self.auth_header()?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                "{} {} (attempt {}/{})",
                replayable.method,
                replayable.url.path(),
                attempt,
                retry.total_attempts()
            );

            let cause = match self
                .client
                .execute(replayable.build(&self.client, &authorization)?)
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if is_retryable_status(response.status()) => {
                    format!("HTTP {}", response.status().as_u16())
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(status_error(status, &body));
                }
                Err(e) if is_retryable_error(&e) => e.to_string(),
                Err(e) => return Err(Error::api(None, format!("HTTP request failed: {}", e))),
            };

            if !retry.allows_retry_after(attempt) {
                return Err(Error::api(
                    None,
                    format!("HTTP request failed after {} attempts: {}", attempt, cause),
                ));
            }

            let delay = retry.delay_after(attempt);
            warn!(
                "{} {} failed with {} (attempt {}/{}), retrying in {:?}",
                replayable.method,
                replayable.url.path(),
                cause,
                attempt,
                retry.total_attempts(),
                delay
            );
            sleep(delay).await;
        }
    }

    /// Sends a request and decodes its JSON body. `what` names the
    /// response in error messages.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: Request, what: &str) -> Result<T> {
        let response = self.execute(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::api(None, format!("Failed to read {} response: {}", what, e)))?;

        serde_json::from_str(&body).map_err(|e| {
            Error::api(
                None,
                format!("Failed to parse {} response: {} - body: {}", what, e, body),
            )
        })
    }
}

/// Crate error for a non-success response.
fn status_error(status: StatusCode, body: &str) -> Error {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.error_code, parsed.message) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (None, Some(message)) => message,
        _ if body.trim().is_empty() => format!("HTTP {}", status.as_u16()),
        _ => format!("HTTP {} - {}", status.as_u16(), body.trim()),
    };

    if status == StatusCode::NOT_FOUND {
        Error::not_found(message)
    } else {
        Error::api(Some(status.as_u16()), message)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}
