use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::modules::request::domain::{PerformanceStats, RequestMetric};
use crate::shared::errors::AppResult;

/// Bounded, oldest-first-evicting record of request metrics
#[derive(Debug)]
pub struct PerformanceMonitor {
    metrics: RwLock<VecDeque<RequestMetric>>,
    max_metrics: usize,
}

impl PerformanceMonitor {
    pub fn new(max_metrics: usize) -> Self {
        let max_metrics = max_metrics.max(1);
        Self {
            metrics: RwLock::new(VecDeque::with_capacity(max_metrics.min(4096))),
            max_metrics,
        }
    }

    /// Run `operation`, then record how long it took and whether it failed.
    ///
    /// The operation's result is handed back untouched; an error is recorded
    /// as `succeeded = false` and still propagates.
    pub async fn track<Fut, T>(
        &self,
        endpoint: &str,
        method: &str,
        cached: bool,
        operation: Fut,
    ) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        let started = Instant::now();
        let result = operation.await;

        self.record(RequestMetric::new(
            endpoint,
            method,
            started.elapsed(),
            result.is_ok(),
            cached,
        ))
        .await;

        result
    }

    /// Append a metric, dropping the oldest one once at capacity
    pub async fn record(&self, metric: RequestMetric) {
        let mut metrics = self.metrics.write().await;
        metrics.push_back(metric);
        while metrics.len() > self.max_metrics {
            metrics.pop_front();
        }
    }

    /// Statistics over the most recent `last_n` metrics; `0` means all of them
    pub async fn stats(&self, last_n: usize) -> PerformanceStats {
        let metrics = self.metrics.read().await;
        let skip = match last_n {
            0 => 0,
            n => metrics.len().saturating_sub(n),
        };
        PerformanceStats::from_metrics(metrics.iter().skip(skip))
    }

    /// Statistics over every stored metric, grouped by endpoint
    pub async fn stats_by_endpoint(&self) -> BTreeMap<String, PerformanceStats> {
        let metrics = self.metrics.read().await;

        let mut grouped: BTreeMap<&str, Vec<&RequestMetric>> = BTreeMap::new();
        for metric in metrics.iter() {
            grouped.entry(metric.endpoint.as_str()).or_default().push(metric);
        }

        grouped
            .into_iter()
            .map(|(endpoint, group)| {
                (
                    endpoint.to_string(),
                    PerformanceStats::from_metrics(group.into_iter()),
                )
            })
            .collect()
    }

    /// Most recent `n` metrics in arrival order
    pub async fn recent(&self, n: usize) -> Vec<RequestMetric> {
        let metrics = self.metrics.read().await;
        let skip = metrics.len().saturating_sub(n);
        metrics.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.metrics.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_metrics
    }

    /// Clear all metrics
    pub async fn clear(&self) {
        self.metrics.write().await.clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(1000)
    }
}
