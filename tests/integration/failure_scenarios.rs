//! Failure tests for node agents
//!
//! These tests verify the swallow-or-deactivate policy:
//! - Failed periodic samples deactivate the agent
//! - Failed init probes are swallowed
//! - Callers transparently get a fresh agent after deactivation

use std::time::Duration;

use assert_matches::assert_matches;
use node_monitor::{StatCounter, actors::messages::AgentEvent, sampler::SamplerState};
use tokio::time::{sleep, timeout};

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_periodic_failure_deactivates_and_resets_state() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 4, Some("1.0.0"));
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    registry
        .report_counters(&address, vec![StatCounter::new("requests", 42)])
        .await
        .unwrap();
    let agent = registry.agent(&address).await;

    cluster.fail(&address);
    agent.closed().await;
    assert!(!agent.is_active());

    // next call lands on a blank instance
    let history = registry.runtime_statistics(&address).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(Option::is_none));
    assert!(registry.counters(&address).await.unwrap().is_empty());

    let fresh = registry.agent(&address).await;
    assert_ne!(fresh.instance(), agent.instance());
    assert_eq!(fresh.status().await.unwrap().sampler, SamplerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_deactivation_event_published() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 4, None);
    let mut events = registry.subscribe();
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    cluster.fail(&address);

    let deactivated = timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(AgentEvent::Deactivated { node, .. }) = events.recv().await {
                return node;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(deactivated, address);
    assert!(registry.active_nodes().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_init_probe_does_not_deactivate() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 3, None);
    let address = node("10.0.0.1:11111");

    cluster.fail(&address);
    registry.init(&address, settings(1000)).await.unwrap();

    let agent = registry.agent(&address).await;
    let history = agent.get_runtime_statistics().await.unwrap();
    assert!(history.iter().all(Option::is_none));
    assert!(agent.is_active());

    // node comes back before the first periodic tick
    cluster.recover(&address);
    sleep(Duration::from_millis(1500)).await;

    assert!(agent.is_active());
    assert_eq!(cluster.calls(&address), 2);
    let history = agent.get_runtime_statistics().await.unwrap();
    assert_eq!(cpu_history(&history), vec![None, None, Some(2.0)]);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_agent_survives_dead_node() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 3, None);
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    registry.enable(&address, false).await.unwrap();
    cluster.fail(&address);

    sleep(Duration::from_secs(5)).await;

    let agent = registry.agent(&address).await;
    assert!(agent.is_active());
    assert_eq!(cluster.calls(&address), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_handle_reports_deactivation() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 3, None);
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    let agent = registry.agent(&address).await;

    cluster.fail(&address);
    agent.closed().await;

    assert_matches!(
        agent.get_counters().await,
        Err(node_monitor::error::AgentError::Deactivated(_))
    );
}
