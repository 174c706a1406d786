//! AgentRegistry - Supervises one agent per monitored node
//!
//! The registry is the stand-in for an actor host: it hands out agents by
//! node address, forgets agents that deactivated themselves, and lazily
//! spawns a blank replacement on the next lookup. Callers going through the
//! registry never observe a deactivated agent; at worst they see a fresh one
//! with empty history and counters.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, instrument};

use crate::cluster::ClusterManagement;
use crate::counters::HostMetadata;
use crate::error::{AgentError, AgentResult};
use crate::{AgentSettings, DEFAULT_HISTORY_LENGTH, NodeAddress, RuntimeStatistics, StatCounter};

use super::agent::{AgentContext, AgentHandle};
use super::messages::{AgentEvent, AgentStatus};

/// Capacity of the lifecycle event channel
const EVENT_CHANNEL_SIZE: usize = 256;

/// Deployment-wide agent settings
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Number of samples every agent retains
    pub history_length: usize,

    /// Whether periodic sampling starts enabled on a fresh agent
    pub sampling_enabled: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            history_length: DEFAULT_HISTORY_LENGTH,
            sampling_enabled: true,
        }
    }
}

#[derive(Clone)]
pub struct AgentRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    agents: Mutex<HashMap<NodeAddress, AgentHandle>>,
    context: AgentContext,
    next_instance: AtomicU64,
}

impl AgentRegistry {
    pub fn new(
        config: RegistryConfig,
        cluster: Arc<dyn ClusterManagement>,
        metadata: Arc<dyn HostMetadata>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        debug!(
            "creating agent registry (history length {}, sampling enabled {})",
            config.history_length, config.sampling_enabled
        );

        Self {
            inner: Arc::new(RegistryInner {
                agents: Mutex::new(HashMap::new()),
                context: AgentContext {
                    history_length: config.history_length,
                    sampling_enabled: config.sampling_enabled,
                    cluster,
                    metadata,
                    event_tx,
                },
                next_instance: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe to lifecycle events of all agents
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.inner.context.event_tx.subscribe()
    }

    /// Look up the agent for `address`, spawning a fresh one if none is active
    pub async fn agent(&self, address: &NodeAddress) -> AgentHandle {
        let mut agents = self.inner.agents.lock().await;

        if let Some(handle) = agents.get(address)
            && handle.is_active()
        {
            return handle.clone();
        }

        let instance = self.inner.next_instance.fetch_add(1, Ordering::Relaxed);
        debug!(node = %address, instance, "activating agent");

        let handle = AgentHandle::spawn(address.clone(), instance, self.inner.context.clone());
        agents.insert(address.clone(), handle.clone());

        handle
    }

    /// Addresses of all agents that are currently running
    pub async fn active_nodes(&self) -> Vec<NodeAddress> {
        let mut agents = self.inner.agents.lock().await;
        agents.retain(|_, handle| handle.is_active());

        let mut nodes: Vec<_> = agents.keys().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Shut down and forget the agent for `address`
    pub async fn remove(&self, address: &NodeAddress) -> bool {
        let handle = self.inner.agents.lock().await.remove(address);

        match handle {
            Some(handle) => {
                let _ = handle.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Shut down every agent
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.inner.agents.lock().await.drain().map(|(_, h)| h).collect();

        debug!("shutting down {} agents", handles.len());

        join_all(handles.iter().map(|handle| async move {
            if handle.shutdown().await.is_ok() {
                handle.closed().await;
            }
        }))
        .await;
    }

    pub async fn init(
        &self,
        address: &NodeAddress,
        settings: Option<AgentSettings>,
    ) -> AgentResult<()> {
        self.with_agent(address, move |agent| {
            let settings = settings.clone();
            async move { agent.init(settings).await }
        })
        .await
    }

    pub async fn enable(&self, address: &NodeAddress, enabled: bool) -> AgentResult<()> {
        self.with_agent(address, move |agent| async move { agent.enable(enabled).await })
            .await
    }

    pub async fn stop_sampling(&self, address: &NodeAddress) -> AgentResult<()> {
        self.with_agent(address, |agent| async move { agent.stop_sampling().await })
            .await
    }

    pub async fn report_counters(
        &self,
        address: &NodeAddress,
        counters: Vec<StatCounter>,
    ) -> AgentResult<()> {
        self.with_agent(address, move |agent| {
            let counters = counters.clone();
            async move { agent.report_counters(counters).await }
        })
        .await
    }

    pub async fn runtime_statistics(
        &self,
        address: &NodeAddress,
    ) -> AgentResult<Vec<Option<RuntimeStatistics>>> {
        self.with_agent(address, |agent| async move { agent.get_runtime_statistics().await })
            .await
    }

    pub async fn counters(&self, address: &NodeAddress) -> AgentResult<Vec<StatCounter>> {
        self.with_agent(address, |agent| async move { agent.get_counters().await })
            .await
    }

    pub async fn extended_properties(
        &self,
        address: &NodeAddress,
    ) -> AgentResult<BTreeMap<String, String>> {
        self.with_agent(address, |agent| async move {
            agent.get_extended_properties().await
        })
        .await
    }

    pub async fn status(&self, address: &NodeAddress) -> AgentResult<AgentStatus> {
        self.with_agent(address, |agent| async move { agent.status().await })
            .await
    }

    /// Run `op` against the node's agent, retrying once on a fresh agent if
    /// the current one deactivated in between
    async fn with_agent<T, F, Fut>(&self, address: &NodeAddress, op: F) -> AgentResult<T>
    where
        F: Fn(AgentHandle) -> Fut,
        Fut: Future<Output = AgentResult<T>>,
    {
        let agent = self.agent(address).await;

        match op(agent).await {
            Err(AgentError::Deactivated(_)) => {
                debug!(node = %address, "agent deactivated mid-call, retrying on a fresh instance");
                op(self.agent(address).await).await
            }
            result => result,
        }
    }
}
