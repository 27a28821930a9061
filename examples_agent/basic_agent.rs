use tokio::time::{sleep, Duration};
use tracing::{error, info};

use loggyto_agent::init::{install, InstallOptions};
use loggyto_agent::config::AgentConfig;

#[tokio::main]
async fn main() {
    let config = AgentConfig::from_attributes([
        ("data-endpoint", "http://127.0.0.1:8080/v1/logs"),
        ("data-api-key", "demo-key"),
        ("data-api-secret", "demo-secret"),
    ]);

    let agent = match install(&config, InstallOptions::default()) {
        Ok(Some(agent)) => agent,
        Ok(None) => return,
        Err(e) => {
            eprintln!("failed to install agent: {}", e);
            return;
        }
    };

    info!("service started");
    error!(order_id = 123, "order failed");

    // Reported as a failed fetch unless something answers with 2xx/3xx.
    let request = agent.fetch().client().get("http://127.0.0.1:8080/health");
    let _ = agent.fetch().send(request).await;

    agent
        .interceptor()
        .spawn_detached(async { Err::<(), _>("background job failed") });

    // Give detached deliveries time to leave the process.
    sleep(Duration::from_secs(1)).await;
}
