use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One observed request attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetric {
    pub endpoint: String,
    pub method: String,
    pub duration: Duration,
    pub succeeded: bool,
    pub served_from_cache: bool,
    pub recorded_at: DateTime<Utc>,
}

impl RequestMetric {
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        duration: Duration,
        succeeded: bool,
        served_from_cache: bool,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            duration,
            succeeded,
            served_from_cache,
            recorded_at: Utc::now(),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// Aggregate view over a run of metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_requests: usize,
    /// Seconds, rounded to the millisecond
    pub avg_duration: f64,
    /// Percentage, two decimals
    pub success_rate: f64,
    /// Percentage, two decimals
    pub cache_hit_rate: f64,
    pub fastest_request: Option<f64>,
    pub slowest_request: Option<f64>,
}

impl PerformanceStats {
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            avg_duration: 0.0,
            success_rate: 0.0,
            cache_hit_rate: 0.0,
            fastest_request: None,
            slowest_request: None,
        }
    }

    pub fn from_metrics<'a, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = &'a RequestMetric>,
    {
        let mut total = 0usize;
        let mut successful = 0usize;
        let mut cached = 0usize;
        let mut duration_sum = 0.0f64;
        let mut fastest = f64::INFINITY;
        let mut slowest = f64::NEG_INFINITY;

        for metric in metrics {
            let secs = metric.duration_secs();
            total += 1;
            successful += metric.succeeded as usize;
            cached += metric.served_from_cache as usize;
            duration_sum += secs;
            fastest = fastest.min(secs);
            slowest = slowest.max(secs);
        }

        if total == 0 {
            return Self::empty();
        }

        let total_f = total as f64;
        Self {
            total_requests: total,
            avg_duration: round_to(duration_sum / total_f, 3),
            success_rate: round_to(successful as f64 / total_f * 100.0, 2),
            cache_hit_rate: round_to(cached as f64 / total_f * 100.0, 2),
            fastest_request: Some(fastest),
            slowest_request: Some(slowest),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
