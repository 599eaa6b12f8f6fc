#![allow(dead_code)]

//! Shared fixtures for integration tests

use async_trait::async_trait;
use mockall::mock;
use resilient_request::{ApiRequest, AppResult, RequestLayerConfig, ResilientClient, Transport};
use serde_json::{json, Value};
use std::sync::Arc;

mock! {
    pub Transport {}

    #[async_trait]
    impl Transport for Transport {
        async fn perform(&self, request: &ApiRequest) -> AppResult<Value>;
    }
}

pub const USERS_URL: &str = "https://users.example.com/v1/users";

pub fn user_url(id: u64) -> String {
    format!("{}/{}", USERS_URL, id)
}

pub fn user_json(id: u64) -> Value {
    json!({ "id": id, "login": format!("user{}", id) })
}

/// Client with default config over the given mock
pub fn client_over(transport: MockTransport) -> Arc<ResilientClient> {
    client_with_config(transport, RequestLayerConfig::default())
}

pub fn client_with_config(
    transport: MockTransport,
    config: RequestLayerConfig,
) -> Arc<ResilientClient> {
    Arc::new(build_client(transport, config))
}

pub fn build_client(transport: MockTransport, config: RequestLayerConfig) -> ResilientClient {
    match ResilientClient::new(Arc::new(transport), config) {
        Ok(client) => client,
        Err(e) => panic!("invalid test config: {}", e),
    }
}

/// Mock that must never be called
pub fn idle_transport() -> MockTransport {
    let mut transport = MockTransport::new();
    transport.expect_perform().never();
    transport
}
