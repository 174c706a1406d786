//! End-to-end sampling over HTTP against a mocked node endpoint

use std::sync::Arc;
use std::time::Duration;

use node_monitor::{
    actors::registry::{AgentRegistry, RegistryConfig},
    cluster::{HttpClusterManagement, SECRET_HEADER},
    counters::ProcessMetadata,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn statistics_json(cpu_usage: f32) -> serde_json::Value {
    serde_json::to_value(create_test_statistics(cpu_usage)).unwrap()
}

fn http_registry(token: Option<&str>) -> AgentRegistry {
    let cluster =
        HttpClusterManagement::new(Duration::from_secs(2), token.map(String::from)).unwrap();

    AgentRegistry::new(
        RegistryConfig {
            history_length: 5,
            sampling_enabled: true,
        },
        Arc::new(cluster),
        Arc::new(ProcessMetadata::default()),
    )
}

fn address_of(server: &MockServer) -> node_monitor::NodeAddress {
    let url = url::Url::parse(&server.uri()).unwrap();
    node(&format!("{}:{}", url.host_str().unwrap(), url.port().unwrap()))
}

#[tokio::test]
async fn test_init_samples_node_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .and(header(SECRET_HEADER, "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statistics_json(37.5)))
        .mount(&mock_server)
        .await;

    let registry = http_registry(Some("test-token"));
    let address = address_of(&mock_server);

    registry.init(&address, settings(60_000)).await.unwrap();

    let history = registry.runtime_statistics(&address).await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(cpu_history(&history)[4], Some(37.5));

    registry.shutdown().await;
}

#[tokio::test]
async fn test_node_failure_over_http_deactivates_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statistics_json(10.0)))
        .mount(&mock_server)
        .await;

    let registry = http_registry(None);
    let address = address_of(&mock_server);

    registry.init(&address, settings(200)).await.unwrap();
    let agent = registry.agent(&address).await;

    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    tokio::time::timeout(Duration::from_secs(5), agent.closed())
        .await
        .expect("agent should deactivate once the node fails");

    let history = registry.runtime_statistics(&address).await.unwrap();
    assert!(history.iter().all(Option::is_none));
}
