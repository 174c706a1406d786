//! Sampling timer and failure policy
//!
//! ```text
//!   Idle ──start()──▶ Running ──periodic failure──▶ Stopped
//!    ▲                  │
//!    └─────stop()───────┘
//! ```
//!
//! The sampler owns the periodic timer and decides what a fetch result means.
//! Whether a failure may terminate the agent is carried by the [`Trigger`] of
//! each attempt, so the policy can be exercised without any timer involved.

use std::future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, trace, warn};

use crate::RuntimeStatistics;
use crate::error::SampleError;
use crate::history::HistoryBuffer;

/// Delay before the first periodic tick after the timer is (re)started
pub const FIRST_TICK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerState {
    /// No timer registered
    Idle,
    /// Timer registered, ticks are delivered
    Running,
    /// Terminal: the node was declared dead
    Stopped,
}

/// What caused a sampling attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Regular timer tick; a failure here deactivates the agent
    Periodic,
    /// Immediate probe (e.g. during init); failures are swallowed
    Manual,
}

impl Trigger {
    pub fn deactivation_eligible(self) -> bool {
        matches!(self, Trigger::Periodic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The result was pushed into the history
    Recorded,
    /// The attempt failed and was ignored
    Skipped,
    /// The attempt failed on a periodic tick; the owner must deactivate
    Deactivate,
}

pub struct Sampler {
    state: SamplerState,
    timer: Option<Interval>,
    enabled: bool,
}

impl Sampler {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: SamplerState::Idle,
            timer: None,
            enabled,
        }
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Gate periodic sampling without touching the timer
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// (Re)start the periodic timer, disposing any previous one
    pub fn start(&mut self, period: Duration) {
        if self.state == SamplerState::Stopped {
            warn!("refusing to restart a stopped sampler");
            return;
        }

        debug!("starting sampler with period {period:?}");

        let mut timer = interval_at(Instant::now() + FIRST_TICK_DELAY, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.timer = Some(timer);
        self.state = SamplerState::Running;
    }

    /// Cancel the timer without requesting deactivation
    pub fn stop(&mut self) {
        if self.state == SamplerState::Running {
            debug!("stopping sampler");
            self.timer = None;
            self.state = SamplerState::Idle;
        }
    }

    /// Wait for the next periodic tick
    ///
    /// Never resolves while no timer is registered.
    pub async fn next_tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }

    /// Apply the result of one sampling attempt
    pub fn resolve(
        &mut self,
        trigger: Trigger,
        result: Result<Option<RuntimeStatistics>, SampleError>,
        history: &mut HistoryBuffer,
    ) -> SampleOutcome {
        match result {
            Ok(sample) => {
                trace!(present = sample.is_some(), "recording sample");
                history.push(sample);
                SampleOutcome::Recorded
            }
            Err(e) if trigger.deactivation_eligible() => {
                warn!("periodic sample failed, node is probably dead: {e}");
                self.timer = None;
                self.state = SamplerState::Stopped;
                SampleOutcome::Deactivate
            }
            Err(e) => {
                warn!("ignoring failed {trigger:?} sample: {e}");
                SampleOutcome::Skipped
            }
        }
    }
}
