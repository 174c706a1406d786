//! Concurrency tests
//!
//! These tests verify that agents are independent of each other and that
//! concurrent callers of one agent are serialised by its mailbox.

use std::time::Duration;

use futures::future::join_all;
use node_monitor::StatCounter;
use tokio::time::sleep;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_dead_node_does_not_affect_others() {
    let cluster = ScriptedCluster::new();
    let registry = create_test_registry(cluster.clone(), 5, None);
    let nodes: Vec<_> = (1..=5).map(|i| node(&format!("10.0.0.{i}:11111"))).collect();

    join_all(nodes.iter().map(|n| registry.init(n, settings(1000))))
        .await
        .into_iter()
        .for_each(|result| result.unwrap());

    cluster.fail(&nodes[2]);
    sleep(Duration::from_millis(2500)).await;

    let active = registry.active_nodes().await;
    assert_eq!(active.len(), 4);
    assert!(!active.contains(&nodes[2]));

    for n in nodes.iter().filter(|n| **n != nodes[2]) {
        let history = registry.runtime_statistics(n).await.unwrap();
        assert_eq!(
            cpu_history(&history)[2..].to_vec(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reports_are_last_write_wins() {
    let registry = create_test_registry(ScriptedCluster::new(), 3, None);
    let address = node("10.0.0.1:11111");

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let registry = registry.clone();
            let address = address.clone();
            tokio::spawn(async move {
                registry
                    .report_counters(&address, vec![StatCounter::new("writer", i)])
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // exactly one complete snapshot survives, never a merge
    let counters = registry.counters(&address).await.unwrap();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].name, "writer");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_share_one_agent() {
    let registry = create_test_registry(ScriptedCluster::new(), 3, None);
    let address = node("10.0.0.1:11111");

    let handles = join_all((0..10).map(|_| registry.agent(&address))).await;

    let first = handles[0].instance();
    assert!(handles.iter().all(|h| h.instance() == first));
    assert_eq!(registry.active_nodes().await, vec![address]);
}
