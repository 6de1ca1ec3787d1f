//! FleetGrid decision ledger — placement decisions and conflicts per workload.
//!
//! The ledger is the only shared mutable state in the placement core.
//! Appends for one workload are serialized; unrelated workloads proceed
//! in parallel.
//!
//! # Components
//!
//! - **`conflict`** — Conflict rules and classification by precedence
//! - **`ledger`** — Per-workload append-only records, conflict resolution, statistics

pub mod conflict;
pub mod ledger;

pub use conflict::{ConflictFinding, ConflictRules, classify};
pub use ledger::{DecisionLedger, LedgerError, LedgerResult, LedgerSnapshot, RecordOutcome};
