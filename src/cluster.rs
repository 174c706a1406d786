//! Cluster-management facility used by agents to sample their node
//!
//! Agents never talk to a node directly; they ask a [`ClusterManagement`]
//! implementation for the node's current runtime statistics. The HTTP
//! implementation polls the `/stats` endpoint served by `monitor-node`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use sysinfo::System;
use tracing::{instrument, trace};

use crate::error::SampleError;
use crate::{LoadAverage, NodeAddress, RuntimeStatistics};

/// Header carrying the shared secret for node endpoints
pub const SECRET_HEADER: &str = "X-MONITORING-SECRET";

/// Fetches live runtime statistics for a node
///
/// `Ok(None)` means the facility answered but had no statistics for the node.
/// Any `Err` is treated as "node unreachable" by the sampler.
#[async_trait]
pub trait ClusterManagement: Send + Sync {
    async fn fetch_runtime_statistics(
        &self,
        address: &NodeAddress,
    ) -> Result<Option<RuntimeStatistics>, SampleError>;
}

/// Cluster management over HTTP
///
/// The client is built once and reused for every agent sharing this facility.
#[derive(Debug, Clone)]
pub struct HttpClusterManagement {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpClusterManagement {
    pub fn new(timeout: Duration, token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, token })
    }
}

#[async_trait]
impl ClusterManagement for HttpClusterManagement {
    #[instrument(skip(self), fields(node = %address))]
    async fn fetch_runtime_statistics(
        &self,
        address: &NodeAddress,
    ) -> Result<Option<RuntimeStatistics>, SampleError> {
        let url = format!("http://{address}/stats");

        trace!("requesting runtime statistics from {url}");

        let mut request = self.client.get(&url);

        if let Some(token) = &self.token {
            request = request.header(SECRET_HEADER, token);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => {
                trace!("node has no statistics yet");
                return Ok(None);
            }
            status if !status.is_success() => return Err(SampleError::Status(status.as_u16())),
            _ => {}
        }

        let body = response.text().await?;
        let statistics: RuntimeStatistics = serde_json::from_str(&body)?;

        trace!("successfully parsed runtime statistics");

        Ok(Some(statistics))
    }
}

/// Take a runtime-statistics sample of the local machine
///
/// Blocks for [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] so CPU usage is meaningful.
pub fn sample_local_statistics() -> RuntimeStatistics {
    let mut sys = System::new_all();
    sys.refresh_all();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let load = System::load_average();

    RuntimeStatistics {
        timestamp: Utc::now(),
        host_name: System::host_name(),
        cpu_usage: sys.global_cpu_usage(),
        memory_total: sys.total_memory(),
        memory_used: sys.used_memory(),
        available_memory: sys.available_memory(),
        swap_total: sys.total_swap(),
        swap_used: sys.used_swap(),
        load_average: LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        },
        process_count: sys.processes().len(),
        uptime_secs: System::uptime(),
    }
}
