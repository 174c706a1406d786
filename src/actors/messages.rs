//! Message types for agent communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Requests sent to one agent via its mpsc mailbox
//! 2. **Events**: Lifecycle notifications broadcast by every agent of a registry
//! 3. **Request/Response**: oneshot channels for replies

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::AgentResult;
use crate::sampler::SamplerState;
use crate::{AgentSettings, NodeAddress, RuntimeStatistics, StatCounter};

/// Commands that can be sent to a NodeAgentActor
#[derive(Debug)]
pub enum AgentCommand {
    /// Store settings, restart the sampler and take one immediate sample
    Init {
        settings: Option<AgentSettings>,
        respond_to: oneshot::Sender<AgentResult<()>>,
    },

    /// Gate periodic sampling
    Enable {
        enabled: bool,
        respond_to: oneshot::Sender<()>,
    },

    /// Cancel the sampling timer without deactivating
    StopSampling { respond_to: oneshot::Sender<()> },

    /// Overwrite the counter snapshot (one-way, no reply)
    ReportCounters { counters: Vec<StatCounter> },

    GetRuntimeStatistics {
        respond_to: oneshot::Sender<Vec<Option<RuntimeStatistics>>>,
    },

    GetCounters {
        respond_to: oneshot::Sender<Vec<StatCounter>>,
    },

    GetExtendedProperties {
        respond_to: oneshot::Sender<BTreeMap<String, String>>,
    },

    GetStatus {
        respond_to: oneshot::Sender<AgentStatus>,
    },

    /// Gracefully shut down the agent
    Shutdown,
}

/// Lifecycle events published by agents
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A fresh agent instance was spawned for a node
    Activated { node: NodeAddress, instance: u64 },

    /// A sample (possibly absent) was pushed into a node's history
    Sampled {
        node: NodeAddress,
        instance: u64,
        present: bool,
        timestamp: DateTime<Utc>,
    },

    /// The agent terminated itself because its node became unreachable
    Deactivated {
        node: NodeAddress,
        instance: u64,
        timestamp: DateTime<Utc>,
    },
}

impl AgentEvent {
    pub fn node(&self) -> &NodeAddress {
        match self {
            AgentEvent::Activated { node, .. }
            | AgentEvent::Sampled { node, .. }
            | AgentEvent::Deactivated { node, .. } => node,
        }
    }
}

/// Current state of one agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub node: NodeAddress,
    pub instance: u64,
    pub sampler: SamplerState,
    pub enabled: bool,
    pub runtime_version: Option<String>,
    pub history_length: usize,
    pub samples_present: usize,
    pub counters: usize,
}
