pub mod modules;
pub mod shared;

pub use modules::request::{
    infrastructure::{
        http_client::{rate_limited, Admission},
        service::{AuxiliaryFetch, BatchReport, EnrichmentOutcome, EnrichmentTarget},
        CacheStats,
    },
    ApiRequest, CacheKey, ConcurrencyOrchestrator, HttpMethod, OperationPolicy, PerformanceMonitor,
    PerformanceStats, RequestLayerConfig, RequestMetric, ResilientClient, ResponseCache,
    RetryExecutor, RetryPolicy, SlidingWindowLimiter, Transport, MAX_BATCH_CEILING,
};
pub use shared::{init_logger, AppError, AppResult};
