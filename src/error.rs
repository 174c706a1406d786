//! Error types for agent operations

use std::fmt;

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors surfaced to callers of an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The caller supplied missing or unusable input
    InvalidArgument(String),

    /// The agent behind this handle has shut down (deactivated or stopped)
    Deactivated(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            AgentError::Deactivated(address) => {
                write!(f, "agent for node {} has been deactivated", address)
            }
        }
    }
}

impl std::error::Error for AgentError {}

/// Errors raised while fetching runtime statistics for a node
#[derive(Debug)]
pub enum SampleError {
    /// The node could not be reached
    Unreachable(String),

    /// The node answered with a non-success status
    Status(u16),

    /// The response body could not be decoded
    Decode(String),

    /// Failure reported by a cluster-management implementation
    Other(String),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Unreachable(msg) => write!(f, "node unreachable: {}", msg),
            SampleError::Status(code) => write!(f, "node returned HTTP status {}", code),
            SampleError::Decode(msg) => write!(f, "failed to decode runtime statistics: {}", msg),
            SampleError::Other(msg) => write!(f, "sampling failed: {}", msg),
        }
    }
}

impl std::error::Error for SampleError {}

impl From<reqwest::Error> for SampleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SampleError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SampleError::Status(status.as_u16())
        } else {
            SampleError::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SampleError {
    fn from(err: serde_json::Error) -> Self {
        SampleError::Decode(err.to_string())
    }
}
