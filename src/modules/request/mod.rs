pub mod domain;
pub mod infrastructure;
pub mod traits;

// Re-exports for easy external access
pub use domain::{
    ApiRequest, CacheKey, HttpMethod, PerformanceStats, RequestLayerConfig, RequestMetric,
    MAX_BATCH_CEILING,
};
pub use infrastructure::{
    ConcurrencyOrchestrator, OperationPolicy, PerformanceMonitor, ResilientClient, ResponseCache,
    RetryExecutor, RetryPolicy, SlidingWindowLimiter,
};
pub use traits::Transport;
