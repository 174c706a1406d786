//! NodeAgentActor - Samples one node and keeps its recent history
//!
//! Each monitored node gets its own agent task. All commands and timer ticks
//! for that node are handled one at a time inside the actor loop, so the
//! history, counters and sampler are never touched concurrently.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → ClusterManagement::fetch → Sampler::resolve → HistoryBuffer
//!     ↑                                          │
//!     │                                          └─ periodic failure → deactivate
//!     └─── Commands (Init, Enable, ReportCounters, Get*, Shutdown)
//! ```

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, instrument, trace, warn};

use crate::cluster::ClusterManagement;
use crate::counters::{CounterStore, HostMetadata};
use crate::error::{AgentError, AgentResult};
use crate::history::HistoryBuffer;
use crate::sampler::{SampleOutcome, Sampler, Trigger};
use crate::{AgentSettings, NodeAddress, RuntimeStatistics, StatCounter};

use super::messages::{AgentCommand, AgentEvent, AgentStatus};

/// Capacity of an agent's command mailbox
const MAILBOX_SIZE: usize = 64;

/// Everything an agent needs besides its own address
#[derive(Clone)]
pub struct AgentContext {
    pub history_length: usize,
    pub sampling_enabled: bool,
    pub cluster: Arc<dyn ClusterManagement>,
    pub metadata: Arc<dyn HostMetadata>,
    pub event_tx: broadcast::Sender<AgentEvent>,
}

/// Actor that samples a single node
pub struct NodeAgentActor {
    address: NodeAddress,

    /// Distinguishes successive activations for the same node
    instance: u64,

    history: HistoryBuffer,
    counters: CounterStore,
    sampler: Sampler,

    cluster: Arc<dyn ClusterManagement>,
    metadata: Arc<dyn HostMetadata>,

    command_rx: mpsc::Receiver<AgentCommand>,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl NodeAgentActor {
    pub fn new(
        address: NodeAddress,
        instance: u64,
        context: AgentContext,
        command_rx: mpsc::Receiver<AgentCommand>,
    ) -> Self {
        Self {
            address,
            instance,
            history: HistoryBuffer::new(context.history_length),
            counters: CounterStore::new(),
            sampler: Sampler::new(context.sampling_enabled),
            cluster: context.cluster,
            metadata: context.metadata,
            command_rx,
            event_tx: context.event_tx,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command arrives, the mailbox closes, or a
    /// periodic sample fails and the agent deactivates itself.
    #[instrument(skip(self), fields(node = %self.address, instance = self.instance))]
    pub async fn run(mut self) {
        debug!("starting node agent");

        self.publish(AgentEvent::Activated {
            node: self.address.clone(),
            instance: self.instance,
        });

        loop {
            tokio::select! {
                _ = self.sampler.next_tick() => {
                    if !self.sampler.is_enabled() {
                        trace!("sampling disabled, skipping tick");
                        continue;
                    }

                    if self.sample(Trigger::Periodic).await == SampleOutcome::Deactivate {
                        self.deactivate();
                        break;
                    }
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("command channel closed, shutting down");
                        break;
                    };

                    if self.handle(cmd).await.is_break() {
                        break;
                    }
                }
            }
        }

        debug!("node agent stopped");
    }

    async fn handle(&mut self, cmd: AgentCommand) -> ControlFlow<()> {
        match cmd {
            AgentCommand::Init {
                settings,
                respond_to,
            } => {
                let result = self.init(settings).await;
                let _ = respond_to.send(result);
            }

            AgentCommand::Enable {
                enabled,
                respond_to,
            } => {
                debug!("setting sampling enabled = {enabled}");
                self.sampler.set_enabled(enabled);
                let _ = respond_to.send(());
            }

            AgentCommand::StopSampling { respond_to } => {
                self.sampler.stop();
                let _ = respond_to.send(());
            }

            AgentCommand::ReportCounters { counters } => {
                self.counters.set_counters(counters);
            }

            AgentCommand::GetRuntimeStatistics { respond_to } => {
                let _ = respond_to.send(self.history.snapshot());
            }

            AgentCommand::GetCounters { respond_to } => {
                let _ = respond_to.send(self.counters.counters());
            }

            AgentCommand::GetExtendedProperties { respond_to } => {
                let _ = respond_to.send(self.counters.extended_properties(self.metadata.as_ref()));
            }

            AgentCommand::GetStatus { respond_to } => {
                let _ = respond_to.send(self.status());
            }

            AgentCommand::Shutdown => {
                debug!("received shutdown command");
                self.sampler.stop();
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    async fn init(&mut self, settings: Option<AgentSettings>) -> AgentResult<()> {
        let settings = validate_settings(settings)?;

        debug!(
            "initialising with runtime version {} and frequency {}ms",
            settings.runtime_version, settings.sample_frequency_ms
        );

        self.counters.set_runtime_version(settings.runtime_version);
        self.sampler
            .start(Duration::from_millis(settings.sample_frequency_ms));

        // a failed probe here must never deactivate
        self.sample(Trigger::Manual).await;

        Ok(())
    }

    async fn sample(&mut self, trigger: Trigger) -> SampleOutcome {
        let result = self.cluster.fetch_runtime_statistics(&self.address).await;
        let present = matches!(result, Ok(Some(_)));

        let outcome = self.sampler.resolve(trigger, result, &mut self.history);

        if outcome == SampleOutcome::Recorded {
            self.publish(AgentEvent::Sampled {
                node: self.address.clone(),
                instance: self.instance,
                present,
                timestamp: Utc::now(),
            });
        }

        outcome
    }

    fn deactivate(&mut self) {
        info!("node unreachable, deactivating agent");

        self.publish(AgentEvent::Deactivated {
            node: self.address.clone(),
            instance: self.instance,
            timestamp: Utc::now(),
        });
    }

    fn status(&self) -> AgentStatus {
        AgentStatus {
            node: self.address.clone(),
            instance: self.instance,
            sampler: self.sampler.state(),
            enabled: self.sampler.is_enabled(),
            runtime_version: self.counters.runtime_version().map(String::from),
            history_length: self.history.capacity(),
            samples_present: self.history.snapshot().iter().flatten().count(),
            counters: self.counters.counters().len(),
        }
    }

    fn publish(&self, event: AgentEvent) {
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

fn validate_settings(settings: Option<AgentSettings>) -> AgentResult<AgentSettings> {
    let settings = settings
        .ok_or_else(|| AgentError::InvalidArgument("settings must be provided".to_string()))?;

    if settings.sample_frequency_ms == 0 {
        return Err(AgentError::InvalidArgument(
            "sample frequency must be greater than zero".to_string(),
        ));
    }

    Ok(settings)
}

/// Handle for talking to a NodeAgentActor
///
/// Cheap to clone. Once the agent has shut down every request fails with
/// [`AgentError::Deactivated`].
#[derive(Clone)]
pub struct AgentHandle {
    sender: mpsc::Sender<AgentCommand>,
    address: NodeAddress,
    instance: u64,
}

impl AgentHandle {
    /// Spawn a new agent actor for `address`
    pub fn spawn(address: NodeAddress, instance: u64, context: AgentContext) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(MAILBOX_SIZE);

        let actor = NodeAgentActor::new(address.clone(), instance, context, cmd_rx);

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            address,
            instance,
        }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Whether the actor behind this handle is still running
    pub fn is_active(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Resolves once the actor has shut down
    pub async fn closed(&self) {
        self.sender.closed().await
    }

    pub async fn init(&self, settings: Option<AgentSettings>) -> AgentResult<()> {
        self.request(|respond_to| AgentCommand::Init {
            settings,
            respond_to,
        })
        .await?
    }

    pub async fn enable(&self, enabled: bool) -> AgentResult<()> {
        self.request(|respond_to| AgentCommand::Enable {
            enabled,
            respond_to,
        })
        .await
    }

    pub async fn stop_sampling(&self) -> AgentResult<()> {
        self.request(|respond_to| AgentCommand::StopSampling { respond_to })
            .await
    }

    /// Queue a counter snapshot without waiting for it to be applied
    pub async fn report_counters(&self, counters: Vec<StatCounter>) -> AgentResult<()> {
        self.send(AgentCommand::ReportCounters { counters }).await
    }

    pub async fn get_runtime_statistics(&self) -> AgentResult<Vec<Option<RuntimeStatistics>>> {
        self.request(|respond_to| AgentCommand::GetRuntimeStatistics { respond_to })
            .await
    }

    pub async fn get_counters(&self) -> AgentResult<Vec<StatCounter>> {
        self.request(|respond_to| AgentCommand::GetCounters { respond_to })
            .await
    }

    pub async fn get_extended_properties(&self) -> AgentResult<BTreeMap<String, String>> {
        self.request(|respond_to| AgentCommand::GetExtendedProperties { respond_to })
            .await
    }

    pub async fn status(&self) -> AgentResult<AgentStatus> {
        self.request(|respond_to| AgentCommand::GetStatus { respond_to })
            .await
    }

    /// Gracefully shut down the agent
    pub async fn shutdown(&self) -> AgentResult<()> {
        self.send(AgentCommand::Shutdown).await
    }

    async fn send(&self, cmd: AgentCommand) -> AgentResult<()> {
        self.sender.send(cmd).await.map_err(|_| self.deactivated())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> AgentCommand,
    ) -> AgentResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| self.deactivated())
    }

    fn deactivated(&self) -> AgentError {
        warn!(node = %self.address, "agent is no longer active");
        AgentError::Deactivated(self.address.to_string())
    }
}
