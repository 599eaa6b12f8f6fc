pub mod api_request;
pub mod request_config;

pub use api_request::{ApiRequest, HttpMethod};
pub use request_config::{RequestLayerConfig, MAX_BATCH_CEILING};
