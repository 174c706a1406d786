//! Lifecycle tests for node agents
//!
//! All tests run on a paused tokio clock, so timer ticks are deterministic:
//! the first periodic tick fires one second after init, then every
//! `sample_frequency_ms`.

use std::time::Duration;

use assert_matches::assert_matches;
use node_monitor::{
    StatCounter,
    counters::{HOST_VERSION_KEY, RUNTIME_VERSION_KEY},
    error::AgentError,
    sampler::SamplerState,
};
use pretty_assertions::assert_eq;
use tokio::time::sleep;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_history_has_configured_length_before_and_after_init() {
    for capacity in [1, 3, 10] {
        let cluster = ScriptedCluster::new();
        let registry = create_test_registry(cluster, capacity, None);
        let address = node("10.0.0.1:11111");

        let history = registry.runtime_statistics(&address).await.unwrap();
        assert_eq!(history.len(), capacity);
        assert!(history.iter().all(Option::is_none));

        registry.init(&address, settings(1000)).await.unwrap();

        let history = registry.runtime_statistics(&address).await.unwrap();
        assert_eq!(history.len(), capacity);
        assert!(history[capacity - 1].is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn test_oldest_samples_are_evicted_first() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster, 3, None);
    let address = node("10.0.0.1:11111");

    // S1 from the init probe, S2..S4 from ticks at 1s, 2s and 3s
    registry.init(&address, settings(1000)).await.unwrap();
    sleep(Duration::from_millis(3500)).await;

    let history = registry.runtime_statistics(&address).await.unwrap();
    assert_eq!(cpu_history(&history), vec![Some(2.0), Some(3.0), Some(4.0)]);
}

#[tokio::test(start_paused = true)]
async fn test_reported_counters_read_back_exactly() {
    let registry = create_test_registry(ScriptedCluster::new(), 5, None);
    let address = node("10.0.0.1:11111");

    let first = vec![StatCounter::new("requests", 10), StatCounter::new("errors", 1)];
    let second = vec![
        StatCounter::new("requests", 12).with_delta(2),
        StatCounter::new("requests", 12).with_delta(2),
    ];

    registry.report_counters(&address, first).await.unwrap();
    registry.report_counters(&address, second.clone()).await.unwrap();

    assert_eq!(registry.counters(&address).await.unwrap(), second);
}

#[tokio::test(start_paused = true)]
async fn test_init_without_settings_leaves_state_untouched() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 3, None);
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    let before = registry.runtime_statistics(&address).await.unwrap();

    let result = registry.init(&address, None).await;

    assert_matches!(result, Err(AgentError::InvalidArgument(_)));
    assert_eq!(registry.runtime_statistics(&address).await.unwrap(), before);
    assert_eq!(cluster.calls(&address), 1);

    let properties = registry.extended_properties(&address).await.unwrap();
    assert_eq!(properties.get(RUNTIME_VERSION_KEY).map(String::as_str), Some("3.7.2"));

    // the original timer is still running
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(cluster.calls(&address), 2);
}

#[tokio::test(start_paused = true)]
async fn test_zero_frequency_rejected() {
    let registry = create_test_registry(ScriptedCluster::new(), 3, None);

    let result = registry.init(&node("10.0.0.1:11111"), settings(0)).await;

    assert_matches!(result, Err(AgentError::InvalidArgument(_)));
}

#[tokio::test(start_paused = true)]
async fn test_reinit_restarts_sampler() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 10, None);
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(cluster.calls(&address), 2);

    // new timer: next tick one second after re-init, then every 5s
    registry.init(&address, settings(5000)).await.unwrap();
    assert_eq!(cluster.calls(&address), 3);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(cluster.calls(&address), 4);

    sleep(Duration::from_millis(3000)).await;
    assert_eq!(cluster.calls(&address), 4);

    let agent = registry.agent(&address).await;
    assert_eq!(agent.status().await.unwrap().sampler, SamplerState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_extended_properties() {
    let address = node("10.0.0.1:11111");

    let registry = create_test_registry(ScriptedCluster::new(), 3, Some("2.1.0"));
    assert_eq!(
        registry
            .extended_properties(&address)
            .await
            .unwrap()
            .get(HOST_VERSION_KEY)
            .map(String::as_str),
        Some("2.1.0")
    );

    // no host version available: key omitted, call still succeeds
    let registry = create_test_registry(ScriptedCluster::new(), 3, None);
    assert!(registry.extended_properties(&address).await.unwrap().is_empty());

    registry.init(&address, settings(1000)).await.unwrap();
    let properties = registry.extended_properties(&address).await.unwrap();
    assert_eq!(properties.len(), 1);
    assert_eq!(properties.get(RUNTIME_VERSION_KEY).map(String::as_str), Some("3.7.2"));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_agent_skips_ticks() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 5, None);
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    registry.enable(&address, false).await.unwrap();
    let before = registry.runtime_statistics(&address).await.unwrap();

    // ticks at 1s and 2s are skipped
    sleep(Duration::from_millis(2500)).await;

    assert_eq!(cluster.calls(&address), 1);
    assert_eq!(registry.runtime_statistics(&address).await.unwrap(), before);

    registry.enable(&address, true).await.unwrap();
    sleep(Duration::from_millis(1000)).await;

    assert_eq!(cluster.calls(&address), 2);
    let history = registry.runtime_statistics(&address).await.unwrap();
    assert_eq!(cpu_history(&history)[3..].to_vec(), vec![Some(1.0), Some(2.0)]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_sampling_cancels_timer_without_deactivation() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 3, None);
    let address = node("10.0.0.1:11111");

    registry.init(&address, settings(1000)).await.unwrap();
    registry.stop_sampling(&address).await.unwrap();

    sleep(Duration::from_secs(10)).await;

    assert_eq!(cluster.calls(&address), 1);
    let status = registry.status(&address).await.unwrap();
    assert_eq!(status.sampler, SamplerState::Idle);
    assert_eq!(status.samples_present, 1);
}
