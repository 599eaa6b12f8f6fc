pub mod rate_limiter;
pub mod reqwest_transport;
pub mod resilient_client;
pub mod retry_policy;

pub use rate_limiter::{rate_limited, Admission, SlidingWindowLimiter, WINDOW};
pub use reqwest_transport::ReqwestTransport;
pub use resilient_client::{OperationPolicy, ResilientClient};
pub use retry_policy::{RetryExecutor, RetryOn, RetryPolicy};
