//! Actor-based node agents
//!
//! Every monitored node is watched by its own agent running as an independent
//! tokio task. Agents communicate only through their mailbox and a shared
//! broadcast channel for lifecycle events.
//!
//! ```text
//!              ┌──────────────────┐
//!              │  AgentRegistry   │  lookup-or-spawn by node address
//!              └────────┬─────────┘
//!                       │ spawns
//!          ┌────────────┼────────────┐
//!          │            │            │
//!   ┌──────▼──────┐     │     ┌──────▼──────┐
//!   │ NodeAgent-1 │     │     │ NodeAgent-N │ ── fetch ──▶ ClusterManagement
//!   └──────┬──────┘     │     └──────┬──────┘
//!          └────────────┼────────────┘
//!                       │
//!             ┌─────────▼─────────┐
//!             │ Broadcast Channel │ (AgentEvent)
//!             └───────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: each agent has an mpsc command channel
//! 2. **Events**: agents publish lifecycle events to a broadcast channel
//! 3. **Request/Response**: oneshot channels for reads

pub mod agent;
pub mod messages;
pub mod registry;
