//! API shared state

use std::collections::HashMap;
use std::sync::Arc;

use crate::NodeAddress;
use crate::actors::registry::AgentRegistry;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Registry resolving node addresses to their agents
    pub registry: AgentRegistry,

    /// Display names from the configuration, keyed by node
    pub display_names: Arc<HashMap<NodeAddress, String>>,
}

impl ApiState {
    pub fn new(registry: AgentRegistry, display_names: HashMap<NodeAddress, String>) -> Self {
        Self {
            registry,
            display_names: Arc::new(display_names),
        }
    }

    pub fn display_name(&self, node: &NodeAddress) -> String {
        self.display_names
            .get(node)
            .cloned()
            .unwrap_or_else(|| node.to_string())
    }
}
