pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod cluster;
pub mod config;
pub mod counters;
pub mod error;
pub mod history;
pub mod reporter;
pub mod sampler;
pub mod util;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of samples retained per node unless configured otherwise
pub const DEFAULT_HISTORY_LENGTH: usize = 100;

/// Identity of a monitored node (format: "host:port")
///
/// Every agent is keyed by the address of the node it watches, and the same
/// address is handed to the cluster-management facility when sampling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress(String);

impl NodeAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeAddress {
    type Err = error::AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| {
            error::AgentError::InvalidArgument(format!("node address '{s}' is missing a port"))
        })?;

        if host.is_empty() {
            return Err(error::AgentError::InvalidArgument(format!(
                "node address '{s}' is missing a host"
            )));
        }

        port.parse::<u16>().map_err(|_| {
            error::AgentError::InvalidArgument(format!("node address '{s}' has an invalid port"))
        })?;

        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = error::AgentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeAddress> for String {
    fn from(address: NodeAddress) -> Self {
        address.0
    }
}

/// Point-in-time runtime statistics of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStatistics {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub host_name: Option<String>,
    pub cpu_usage: f32,
    pub memory_total: u64,
    pub memory_used: u64,
    pub available_memory: u64,
    #[serde(default)]
    pub swap_total: u64,
    #[serde(default)]
    pub swap_used: u64,
    #[serde(default)]
    pub load_average: LoadAverage,
    #[serde(default)]
    pub process_count: usize,
    #[serde(default)]
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Application-defined metric pushed by a node's own instrumentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCounter {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

impl StatCounter {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
            delta: None,
        }
    }

    pub fn with_delta(mut self, delta: impl ToString) -> Self {
        self.delta = Some(delta.to_string());
        self
    }
}

/// Settings handed to an agent when it is initialised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub runtime_version: String,
    pub sample_frequency_ms: u64,
}
