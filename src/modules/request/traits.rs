use crate::modules::request::domain::entities::ApiRequest;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde_json::Value;

/// The "perform one HTTP request" primitive supplied by the endpoint layer.
///
/// Implementations classify failures themselves (`NotFound`,
/// `RemoteRateLimited`, `NetworkError`, `ApiError`); the resilience layer only
/// observes that classification.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: &ApiRequest) -> AppResult<Value>;
}
