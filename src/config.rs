use std::net::SocketAddr;

use anyhow::Context;
use tracing::trace;

use crate::actors::registry::RegistryConfig;
use crate::{AgentSettings, DEFAULT_HISTORY_LENGTH, NodeAddress};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Samples retained per node, shared by every agent
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    #[serde(default = "default_sample_frequency_ms")]
    pub sample_frequency_ms: u64,

    /// Version reported as `RuntimeVersion` in extended properties
    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,

    #[serde(default = "default_sampling_enabled")]
    pub sampling_enabled: bool,

    /// Shared secret sent to node `/stats` endpoints
    pub token: Option<String>,

    /// Timeout for a single statistics request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    pub api: Option<ApiSettings>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NodeConfig {
    pub address: NodeAddress,
    pub display: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_api_bind")]
    pub bind: SocketAddr,
    pub token: Option<String>,
    #[serde(default = "default_cors")]
    pub cors: bool,
}

impl Config {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            history_length: self.history_length,
            sampling_enabled: self.sampling_enabled,
        }
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            runtime_version: self.runtime_version.clone(),
            sample_frequency_ms: self.sample_frequency_ms,
        }
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.history_length == 0 {
            anyhow::bail!("history_length must be at least 1");
        }
        if self.sample_frequency_ms == 0 {
            anyhow::bail!("sample_frequency_ms must be greater than zero");
        }
        Ok(self)
    }
}

fn default_history_length() -> usize {
    DEFAULT_HISTORY_LENGTH
}

fn default_sample_frequency_ms() -> u64 {
    1000
}

fn default_runtime_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_sampling_enabled() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_api_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors() -> bool {
    true
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str::<Config>(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?
        .validate()
        .inspect(|config| trace!("loaded config: {config:?}"))
}
