//! Testcontainer setup for ClickHouse.

use std::time::Duration;
use store::ClickHouseConfig;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

/// A reachable ClickHouse server, started here or supplied by the environment.
pub struct TestClickHouse {
    #[allow(dead_code)]
    container: Option<ContainerAsync<GenericImage>>,
    pub config: ClickHouseConfig,
}

impl TestClickHouse {
    /// Use `CLICKSTREAM_TEST_CLICKHOUSE_URL` when set, otherwise start a container.
    pub async fn start() -> Self {
        if let Some(url) = std::env::var("CLICKSTREAM_TEST_CLICKHOUSE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            return Self {
                container: None,
                config: ClickHouseConfig {
                    url,
                    database: std::env::var("CLICKSTREAM_TEST_CLICKHOUSE_DB")
                        .unwrap_or_else(|_| "clickstream_test".to_string()),
                    username: std::env::var("CLICKSTREAM_TEST_CLICKHOUSE_USER").ok(),
                    password: std::env::var("CLICKSTREAM_TEST_CLICKHOUSE_PASSWORD").ok(),
                    timeout_secs: 30,
                },
            };
        }

        let (container, url) = start_clickhouse().await;

        Self {
            container: Some(container),
            config: ClickHouseConfig {
                url,
                database: "clickstream_test".to_string(),
                username: Some("default".to_string()),
                password: None,
                timeout_secs: 30,
            },
        }
    }
}

/// Start ClickHouse container, return container and HTTP URL.
pub async fn start_clickhouse() -> (ContainerAsync<GenericImage>, String) {
    // CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT=1 allows the passwordless default user
    let image = GenericImage::new("clickhouse/clickhouse-server", "24.3")
        .with_wait_for(WaitFor::seconds(5))
        .with_exposed_port(8123.tcp())
        .with_env_var("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1")
        .with_env_var("CLICKHOUSE_USER", "default")
        .with_env_var("CLICKHOUSE_PASSWORD", "");

    let container = image.start().await.expect("Failed to start ClickHouse");

    let port = container.get_host_port_ipv4(8123).await.unwrap();
    let url = format!("http://127.0.0.1:{}", port);

    wait_for_http(&url, Duration::from_secs(30)).await;

    (container, url)
}

/// Wait for HTTP endpoint to respond.
async fn wait_for_http(url: &str, timeout: Duration) {
    let client = reqwest::Client::new();
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if let Ok(resp) = client.get(url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("HTTP endpoint {} not ready after {:?}", url, timeout);
}
