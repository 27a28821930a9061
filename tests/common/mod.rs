//! Helpers shared by the integration tests.
#![allow(dead_code)]

use loggyto_agent::config::{AgentConfig, API_KEY_ATTR, API_SECRET_ATTR, ENDPOINT_ATTR};
use mockito::Mock;
use tokio::time::{sleep, timeout, Duration};

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";

/// Configuration pointing at `<base>/v1/logs` with the test credentials.
pub fn config_for(base: &str) -> AgentConfig {
    let endpoint = format!("{}/v1/logs", base);
    AgentConfig::from_attributes([
        (ENDPOINT_ATTR, endpoint),
        (API_KEY_ATTR, API_KEY.to_string()),
        (API_SECRET_ATTR, API_SECRET.to_string()),
    ])
}

/// Wait until `mock` has seen exactly the number of requests it expects.
pub async fn wait_until_matched(mock: &Mock) {
    let poll = async {
        while !mock.matched_async().await {
            sleep(Duration::from_millis(20)).await;
        }
    };

    if timeout(Duration::from_secs(5), poll).await.is_err() {
        panic!("timed out before the collector received the record");
    }
}
