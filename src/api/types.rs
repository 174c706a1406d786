//! API request and response types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actors::messages::AgentStatus;
use crate::{NodeAddress, RuntimeStatistics, StatCounter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub node: NodeAddress,
    pub display_name: String,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<NodeInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnableRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsResponse {
    pub node: NodeAddress,
    pub history: Vec<Option<RuntimeStatistics>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountersResponse {
    pub node: NodeAddress,
    pub counters: Vec<StatCounter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertiesResponse {
    pub node: NodeAddress,
    pub properties: BTreeMap<String, String>,
}
