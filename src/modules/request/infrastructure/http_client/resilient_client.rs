//! Cached, rate-limited, retried access to the underlying transport
//!
//! One client instance owns one cache, one metrics buffer and one limiter per
//! named operation. Everything issued through the instance shares them.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use super::rate_limiter::SlidingWindowLimiter;
use super::reqwest_transport::ReqwestTransport;
use super::retry_policy::{RetryExecutor, RetryPolicy};
use crate::modules::request::domain::{
    ApiRequest, CacheKey, PerformanceStats, RequestLayerConfig, RequestMetric,
};
use crate::modules::request::infrastructure::cache::{CacheStats, ResponseCache};
use crate::modules::request::infrastructure::monitoring::PerformanceMonitor;
use crate::modules::request::traits::Transport;
use crate::shared::errors::AppResult;
use crate::shared::utils::LogContext;

/// Rate budget and retry behavior for one logical operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationPolicy {
    /// Operations with the same name share one sliding window
    pub name: String,
    pub calls_per_minute: u32,
    pub retry: RetryPolicy,
}

impl OperationPolicy {
    pub fn new(name: impl Into<String>, calls_per_minute: u32, retry: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            calls_per_minute,
            retry,
        }
    }
}

pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    cache: ResponseCache<Value>,
    monitor: Arc<PerformanceMonitor>,
    limiters: DashMap<String, Arc<SlidingWindowLimiter>>,
    config: RequestLayerConfig,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn Transport>, config: RequestLayerConfig) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            cache: ResponseCache::new(config.cache_ttl(), config.cache_max_entries),
            monitor: Arc::new(PerformanceMonitor::new(config.max_metrics_stored)),
            limiters: DashMap::new(),
            config,
        })
    }

    /// Client over the default reqwest transport
    pub fn with_reqwest(config: RequestLayerConfig) -> AppResult<Self> {
        let transport = ReqwestTransport::from_config(&config)?;
        Self::new(Arc::new(transport), config)
    }

    /// Report into an externally owned monitor instead of a private one
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn config(&self) -> &RequestLayerConfig {
        &self.config
    }

    fn default_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.max_retries, self.config.backoff_factor)
    }

    /// Policy at the configured default call budget
    pub fn standard_policy(&self, name: &str) -> OperationPolicy {
        OperationPolicy::new(name, self.config.default_rate_limit, self.default_retry())
    }

    pub fn aggressive_policy(&self, name: &str) -> OperationPolicy {
        OperationPolicy::new(name, self.config.aggressive_rate_limit, self.default_retry())
    }

    pub fn conservative_policy(&self, name: &str) -> OperationPolicy {
        OperationPolicy::new(name, self.config.conservative_rate_limit, self.default_retry())
    }

    /// One underlying request, with cache consult/populate for cacheable reads.
    ///
    /// No rate limiting or retry happens here; see `fetch` and `guarded`.
    pub async fn request(&self, request: &ApiRequest, use_cache: bool) -> AppResult<Value> {
        let method = request.method.as_str();

        if !(use_cache && request.method.is_cacheable()) {
            return self
                .monitor
                .track(&request.url, method, false, self.transport.perform(request))
                .await;
        }

        let started = Instant::now();
        let key = CacheKey::for_request(request);
        if let Some(cached) = self.cache.get(&key).await {
            LogContext::cache_lookup(key.as_str(), true);
            self.monitor
                .record(RequestMetric::new(
                    &request.url,
                    method,
                    started.elapsed(),
                    true,
                    true,
                ))
                .await;
            return Ok(cached);
        }
        LogContext::cache_lookup(key.as_str(), false);

        let value = self
            .monitor
            .track(&request.url, method, false, self.transport.perform(request))
            .await?;
        self.cache.set(key, value.clone()).await;
        Ok(value)
    }

    /// Cached GET
    pub async fn get(&self, url: &str, params: BTreeMap<String, String>) -> AppResult<Value> {
        let request = ApiRequest::get(url).with_params(params);
        self.request(&request, true).await
    }

    /// POST; never cached
    pub async fn post(&self, url: &str, body: Value) -> AppResult<Value> {
        self.request(&ApiRequest::post(url, body), false).await
    }

    /// The limiter guarding `policy.name`, created on first use
    pub fn limiter(&self, policy: &OperationPolicy) -> Arc<SlidingWindowLimiter> {
        self.limiters
            .entry(policy.name.clone())
            .or_insert_with(|| {
                Arc::new(SlidingWindowLimiter::new(
                    policy.name.clone(),
                    policy.calls_per_minute,
                ))
            })
            .clone()
    }

    /// Existing limiter for an operation name, if it has run before
    pub fn limiter_for(&self, name: &str) -> Option<Arc<SlidingWindowLimiter>> {
        self.limiters.get(name).map(|entry| entry.value().clone())
    }

    /// Admit through the operation's limiter, then run `operation` under its retry policy.
    ///
    /// A rejection is returned immediately as `RateLimitExceeded`; the
    /// operation is not run and nothing sleeps.
    pub async fn guarded<F, Fut, T>(&self, policy: &OperationPolicy, operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.limiter(policy).acquire().await?;
        RetryExecutor::new(policy.retry.clone())
            .execute(&policy.name, operation)
            .await
    }

    /// `request` wrapped in rate limiting and retry
    pub async fn fetch(
        &self,
        policy: &OperationPolicy,
        request: &ApiRequest,
        use_cache: bool,
    ) -> AppResult<Value> {
        self.guarded(policy, || self.request(request, use_cache))
            .await
    }

    /// Forget the cached response for one request
    pub async fn invalidate(&self, request: &ApiRequest) -> bool {
        self.cache.invalidate(&CacheKey::for_request(request)).await
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn performance_stats(&self, last_n: usize) -> PerformanceStats {
        self.monitor.stats(last_n).await
    }

    pub async fn endpoint_stats(&self) -> BTreeMap<String, PerformanceStats> {
        self.monitor.stats_by_endpoint().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn clear_metrics(&self) {
        self.monitor.clear().await;
    }
}
