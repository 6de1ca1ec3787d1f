//! Rollout state machine — phases and step progress.
//!
//! ```text
//! Pending ──▶ InProgress ◀──▶ Paused
//!    │            │              │
//!    │            ├──▶ Completed │
//!    ├────────────┴──▶ Aborted ◀─┤
//!    └──────────────▶ Failed ◀───┘   (from any non-terminal phase)
//! ```
//!
//! Transitions are triggered externally; the machine only checks that each
//! one is allowed and records when it happened. Completed, Failed, and
//! Aborted are terminal.

use tracing::{debug, info, warn};

use fleetgrid_types::{IntOrPercent, RolloutPhase, RolloutState, RolloutStrategy};

use crate::{TransitionError, TransitionResult};

/// Surge used when a rolling update leaves `maxSurge` and `maxUnavailable` unset.
const DEFAULT_SURGE_PERCENT: &str = "25%";

/// Whether the transition graph has an edge `from -> to`.
pub fn transition_allowed(from: RolloutPhase, to: RolloutPhase) -> bool {
    use RolloutPhase::*;
    match (from, to) {
        (Completed | Failed | Aborted, _) => false,
        (_, Failed) => true,
        (Pending, InProgress | Aborted) => true,
        (InProgress, Paused | Completed | Aborted) => true,
        (Paused, InProgress | Aborted) => true,
        _ => false,
    }
}

/// Calculate number of batches for a rolling update.
fn batch_count(replicas: u32, batch_size: u32) -> u32 {
    if batch_size == 0 {
        return 1;
    }
    replicas.div_ceil(batch_size)
}

/// Number of steps a rollout with `strategy` takes over `replicas`.
///
/// Canary: one per step. BlueGreen: deploy, then switch. RollingUpdate:
/// batches sized by the larger of `maxSurge` (rounded up) and
/// `maxUnavailable` (rounded down), at least one replica per batch.
pub fn total_steps(strategy: &RolloutStrategy, replicas: u32) -> u32 {
    match strategy {
        RolloutStrategy::Canary { steps } => u32::try_from(steps.len()).unwrap_or(u32::MAX),
        RolloutStrategy::BlueGreen { .. } => 2,
        RolloutStrategy::RollingUpdate {
            max_unavailable,
            max_surge,
        } => {
            if replicas == 0 {
                return 0;
            }
            let default_surge = IntOrPercent::Percent(DEFAULT_SURGE_PERCENT.to_string());
            let surge = match (max_surge, max_unavailable) {
                (None, None) => default_surge.resolve(replicas, true),
                (surge, _) => surge.as_ref().and_then(|s| s.resolve(replicas, true)),
            }
            .unwrap_or(0);
            let unavailable = max_unavailable
                .as_ref()
                .and_then(|u| u.resolve(replicas, false))
                .unwrap_or(0);
            batch_count(replicas, surge.max(unavailable).max(1))
        }
    }
}

/// A rollout of one workload's placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollout {
    pub workload: String,
    pub strategy: RolloutStrategy,
    state: RolloutState,
}

impl Rollout {
    /// Create a pending rollout.
    pub fn new(workload: &str, strategy: RolloutStrategy, replicas: u32) -> Self {
        let total = total_steps(&strategy, replicas);
        Self {
            workload: workload.to_string(),
            strategy,
            state: RolloutState {
                total_steps: total,
                ..Default::default()
            },
        }
    }

    /// Resume tracking from a persisted state.
    pub fn from_state(workload: &str, strategy: RolloutStrategy, state: RolloutState) -> Self {
        Self {
            workload: workload.to_string(),
            strategy,
            state,
        }
    }

    pub fn state(&self) -> &RolloutState {
        &self.state
    }

    pub fn phase(&self) -> RolloutPhase {
        self.state.phase
    }

    pub fn into_state(self) -> RolloutState {
        self.state
    }

    fn transition(&mut self, to: RolloutPhase, now: u64, message: Option<String>) -> TransitionResult<()> {
        let from = self.state.phase;
        if !transition_allowed(from, to) {
            debug!(workload = %self.workload, %from, %to, "rollout transition rejected");
            return Err(TransitionError::Rejected { from, to });
        }
        self.state.phase = to;
        self.state.last_transition_time = Some(now);
        self.state.message = message;
        info!(workload = %self.workload, %from, %to, "rollout phase changed");
        Ok(())
    }

    /// Start the rollout. A rollout with no steps completes immediately.
    pub fn start(&mut self, now: u64) -> TransitionResult<()> {
        self.transition(RolloutPhase::InProgress, now, None)?;
        if self.state.total_steps == 0 {
            self.transition(RolloutPhase::Completed, now, Some("no steps to run".to_string()))?;
        }
        Ok(())
    }

    pub fn pause(&mut self, now: u64) -> TransitionResult<()> {
        self.transition(RolloutPhase::Paused, now, None)
    }

    pub fn resume(&mut self, now: u64) -> TransitionResult<()> {
        self.transition(RolloutPhase::InProgress, now, None)
    }

    /// Record one finished step; completes the rollout on the last one.
    ///
    /// Returns the new current step.
    pub fn advance_step(&mut self, now: u64) -> TransitionResult<u32> {
        if self.state.phase != RolloutPhase::InProgress {
            return Err(TransitionError::NotInProgress {
                phase: self.state.phase,
            });
        }
        let (current, total) = (self.state.current_step, self.state.total_steps);
        if current >= total {
            return Err(TransitionError::StepOverflow { current, total });
        }
        self.state.current_step = current + 1;
        self.state.last_transition_time = Some(now);
        debug!(workload = %self.workload, step = current + 1, total, "rollout step finished");
        if self.state.current_step == total {
            self.transition(RolloutPhase::Completed, now, None)?;
        }
        Ok(self.state.current_step)
    }

    /// Mark the rollout failed after an irrecoverable error reported by the executor.
    pub fn fail(&mut self, now: u64, reason: &str) -> TransitionResult<()> {
        self.transition(RolloutPhase::Failed, now, Some(reason.to_string()))?;
        warn!(workload = %self.workload, reason, "rollout failed");
        Ok(())
    }

    pub fn abort(&mut self, now: u64, reason: &str) -> TransitionResult<()> {
        self.transition(RolloutPhase::Aborted, now, Some(reason.to_string()))
    }

    /// Canary traffic weight for the current step.
    ///
    /// `None` for non-canary strategies. Before the first step the canary
    /// receives nothing; a completed canary receives everything.
    pub fn current_canary_weight(&self) -> Option<i32> {
        let RolloutStrategy::Canary { steps } = &self.strategy else {
            return None;
        };
        if self.state.phase == RolloutPhase::Completed {
            return Some(100);
        }
        let weight = match self.state.current_step {
            0 => 0,
            n => steps.get(n as usize - 1).map_or(100, |s| s.weight),
        };
        Some(weight)
    }
}
