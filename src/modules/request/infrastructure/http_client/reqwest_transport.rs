//! Default `Transport` backed by reqwest
//!
//! Classifies every non-2xx answer so the resilience layer above can observe
//! not-found, remote throttling and other failures without parsing anything.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::modules::request::domain::entities::{ApiRequest, RequestLayerConfig};
use crate::modules::request::traits::Transport;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{LogContext, TimedOperation};

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// `timeout` is the single overall limit for one request; retries and
    /// backoff are layered outside of it.
    pub fn new(timeout: Duration, user_agent: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &RequestLayerConfig) -> AppResult<Self> {
        Self::new(config.request_timeout(), &config.user_agent)
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: &ApiRequest) -> AppResult<Value> {
        let method = request.method.as_str();
        LogContext::api_call(method, &request.url, "started", None);
        let timer = TimedOperation::new(&format!("{} {}", method, request.url));

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .header(ACCEPT, "application/json");

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        LogContext::api_call(method, &request.url, status.as_str(), Some(timer.elapsed()));

        if status.is_success() {
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, retry_after, &body, &request.url))
    }
}

/// Seconds from a numeric `Retry-After` header
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Map a non-success answer onto the error taxonomy
pub fn classify_failure(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
    url: &str,
) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(url.to_string()),
        StatusCode::TOO_MANY_REQUESTS => AppError::RemoteRateLimited { retry_after_secs },
        _ => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|json| {
                    json.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("HTTP / {}", status.as_u16()));
            AppError::api(Some(status.as_u16()), message)
        }
    }
}
