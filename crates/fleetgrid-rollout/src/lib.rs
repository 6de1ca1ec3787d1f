//! FleetGrid rollout and traffic state machines.
//!
//! This crate tracks how a placement's live configuration evolves: which
//! phase a rollout is in, how many steps it has taken, and which traffic
//! split is serving. It never executes anything; the rollout executor and
//! the traffic dispatcher are external and report back through these
//! machines.
//!
//! # Components
//!
//! - **`machine`** — Rollout phase/step state machine
//! - **`traffic`** — Staged and active traffic splits, promotion, canary splits

pub mod machine;
pub mod traffic;

use thiserror::Error;

use fleetgrid_types::RolloutPhase;

pub use machine::{Rollout, total_steps, transition_allowed};
pub use traffic::{TrafficController, canary_split};

/// A state change the machines refused. Recoverable; the state is untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("rollout cannot move from {from} to {to}")]
    Rejected { from: RolloutPhase, to: RolloutPhase },

    #[error("rollout steps only advance while InProgress (phase is {phase})")]
    NotInProgress { phase: RolloutPhase },

    #[error("step {current} of {total} is the last step")]
    StepOverflow { current: u32, total: u32 },

    #[error("traffic weights sum to {sum}, expected 100")]
    WeightSum { sum: i64 },

    #[error("traffic weight {weight} for cluster {cluster} outside [0, 100]")]
    WeightRange { cluster: String, weight: i32 },
}

pub type TransitionResult<T> = Result<T, TransitionError>;
