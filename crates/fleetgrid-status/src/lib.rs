//! FleetGrid status projection.
//!
//! Probes run elsewhere; this crate turns their outcomes and the ledger's
//! records into the status blocks reported on each policy.
//!
//! # Components
//!
//! - **`tracker`** — Per-check consecutive counters, thresholds and sliding window score
//! - **`health`** — Aggregation of check results into a policy status
//! - **`projection`** — Placement and session-affinity status views

pub mod health;
pub mod projection;
pub mod tracker;

pub use fleetgrid_types::overall_health_score;
pub use health::{aggregate_status, project_health_status, unhealthy_action};
pub use projection::{project_placement_status, project_session_status};
pub use tracker::{HealthTracker, ProbeResult};
