//! Pushed counters and extended properties of a node

use std::collections::BTreeMap;

use tracing::trace;

use crate::StatCounter;

pub const HOST_VERSION_KEY: &str = "HostVersion";
pub const RUNTIME_VERSION_KEY: &str = "RuntimeVersion";

/// Source of process-level metadata about the host running the agents
pub trait HostMetadata: Send + Sync {
    /// Build version of the host process, if it can be determined
    fn host_version(&self) -> Option<String>;
}

/// Host metadata with a version fixed at startup (usually the binary's
/// `CARGO_PKG_VERSION`)
#[derive(Debug, Clone, Default)]
pub struct ProcessMetadata {
    version: Option<String>,
}

impl ProcessMetadata {
    pub fn new(version: Option<String>) -> Self {
        Self {
            version: version.filter(|v| !v.trim().is_empty()),
        }
    }
}

impl HostMetadata for ProcessMetadata {
    fn host_version(&self) -> Option<String> {
        self.version.clone()
    }
}

/// Latest counter snapshot plus the runtime version supplied at init
#[derive(Debug, Clone, Default)]
pub struct CounterStore {
    counters: Vec<StatCounter>,
    runtime_version: Option<String>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot; last write wins
    pub fn set_counters(&mut self, counters: Vec<StatCounter>) {
        trace!("storing {} counters", counters.len());
        self.counters = counters;
    }

    pub fn counters(&self) -> Vec<StatCounter> {
        self.counters.clone()
    }

    pub fn set_runtime_version(&mut self, version: String) {
        self.runtime_version = Some(version);
    }

    pub fn runtime_version(&self) -> Option<&str> {
        self.runtime_version.as_deref()
    }

    pub fn extended_properties(&self, metadata: &dyn HostMetadata) -> BTreeMap<String, String> {
        let mut properties = BTreeMap::new();

        if let Some(version) = metadata.host_version() {
            properties.insert(HOST_VERSION_KEY.to_string(), version);
        }

        if let Some(version) = &self.runtime_version {
            properties.insert(RUNTIME_VERSION_KEY.to_string(), version.clone());
        }

        properties
    }
}
