use log::{debug, info, warn};
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

/// Initialize the logging system
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info) // Default level
            .filter_module("resilient_request", log::LevelFilter::Debug)
            .filter_module("reqwest", log::LevelFilter::Warn) // Reduce HTTP noise
            .filter_module("hyper", log::LevelFilter::Warn)
            .filter_module("tokio", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .format_target(false)
            .format_module_path(false)
            .try_init();

        info!("Logging system initialized");
    });
}

/// Structured logging helpers for common patterns
pub struct LogContext;

impl LogContext {
    /// Log one underlying request
    pub fn api_call(method: &str, endpoint: &str, status: &str, duration: Option<Duration>) {
        match duration {
            Some(duration) => info!(
                "API: {} {} {} in {}ms",
                method,
                endpoint,
                status,
                duration.as_millis()
            ),
            None => debug!("API: Starting {} {}", method, endpoint),
        }
    }

    /// Log a cache lookup outcome
    pub fn cache_lookup(key: &str, hit: bool) {
        if hit {
            debug!("Cache HIT for {}", key);
        } else {
            debug!("Cache MISS for {}", key);
        }
    }

    /// Log a local admission rejection
    pub fn rate_limited(operation: &str, retry_after_secs: f64) {
        warn!(
            "Rate limit: '{}' rejected, window frees up in {:.1}s",
            operation, retry_after_secs
        );
    }

    /// Log errors with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        warn!("{}: {}", context, error);
    }

    /// Log performance metrics
    pub fn performance_metric(operation: &str, duration_ms: u64, additional_info: Option<&str>) {
        match additional_info {
            Some(info) => info!(
                "Performance: {} took {}ms ({})",
                operation, duration_ms, info
            ),
            None => info!("Performance: {} took {}ms", operation, duration_ms),
        }
    }
}

/// Helper for timing operations
pub struct TimedOperation {
    start: tokio::time::Instant,
    operation: String,
}

impl TimedOperation {
    pub fn new(operation: &str) -> Self {
        debug!("Starting: {}", operation);
        Self {
            start: tokio::time::Instant::now(),
            operation: operation.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish_with_info(self, info: &str) -> u64 {
        let duration = self.start.elapsed().as_millis() as u64;
        LogContext::performance_metric(&self.operation, duration, Some(info));
        duration
    }
}
