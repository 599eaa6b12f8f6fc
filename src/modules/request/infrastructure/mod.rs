pub mod cache;
pub mod http_client;
pub mod monitoring;
pub mod service;

// Re-export commonly used types
pub use cache::{CacheStats, ResponseCache};
pub use http_client::{
    OperationPolicy, ReqwestTransport, ResilientClient, RetryExecutor, RetryOn, RetryPolicy,
    SlidingWindowLimiter,
};
pub use monitoring::PerformanceMonitor;
pub use service::ConcurrencyOrchestrator;
