//! CounterReporter - Pushes a node's own counters to the hub
//!
//! Runs inside `monitor-node`. Every interval it snapshots process counters
//! and posts them to the hub's counter endpoint for this node. Delivery is
//! best-effort: a failed push is logged and the next interval simply sends a
//! newer snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use sysinfo::{ProcessesToUpdate, System};
use tokio::time::interval;
use tracing::{debug, instrument, trace, warn};

use crate::{NodeAddress, StatCounter};

/// Counters of the node process itself
#[derive(Debug, Default)]
pub struct NodeCounters {
    /// Number of `/stats` requests served
    pub stats_requests: AtomicU64,
}

pub struct CounterReporter {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    period: Duration,
    counters: Arc<NodeCounters>,
    system: System,
    last_requests: u64,
}

impl CounterReporter {
    pub fn new(
        hub_url: &str,
        address: &NodeAddress,
        token: Option<String>,
        period: Duration,
        counters: Arc<NodeCounters>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            url: format!(
                "{}/api/v1/nodes/{address}/counters",
                hub_url.trim_end_matches('/')
            ),
            token,
            period,
            counters,
            system: System::new(),
            last_requests: 0,
        })
    }

    /// Report forever at the configured period
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn run(mut self) {
        debug!("starting counter reporter every {:?}", self.period);

        let mut ticker = interval(self.period);

        loop {
            ticker.tick().await;

            if let Err(e) = self.report().await {
                warn!("failed to report counters: {:#}", e);
            }
        }
    }

    /// Collect and push one snapshot
    pub async fn report(&mut self) -> Result<()> {
        let snapshot = self.collect();

        trace!("reporting {} counters", snapshot.len());

        let mut request = self.client.post(&self.url).json(&snapshot);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("failed to send counters")?;

        if !response.status().is_success() {
            anyhow::bail!("hub rejected counters: {}", response.status());
        }

        Ok(())
    }

    fn collect(&mut self) -> Vec<StatCounter> {
        let requests = self.counters.stats_requests.load(Ordering::Relaxed);
        let delta = requests.saturating_sub(self.last_requests);
        self.last_requests = requests;

        let mut snapshot = vec![StatCounter::new("node.stats_requests", requests).with_delta(delta)];

        if let Ok(pid) = sysinfo::get_current_pid() {
            self.system
                .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

            if let Some(process) = self.system.process(pid) {
                snapshot.push(StatCounter::new("process.cpu_usage", process.cpu_usage()));
                snapshot.push(StatCounter::new("process.memory_bytes", process.memory()));
                snapshot.push(StatCounter::new("process.run_time_secs", process.run_time()));
            }
        }

        snapshot
    }
}
