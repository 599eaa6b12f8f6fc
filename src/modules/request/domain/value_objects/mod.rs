pub mod cache_key;
pub mod request_metric;

pub use cache_key::CacheKey;
pub use request_metric::{PerformanceStats, RequestMetric};
