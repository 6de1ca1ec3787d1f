//! Append-only decision ledger.
//!
//! Each workload owns a [`WorkloadLedger`] behind its own mutex; the map
//! of workloads sits behind an `RwLock` that is only write-locked to add
//! a workload. Decisions are never edited: a status change is recorded as
//! a new decision for the same cluster, and the latest decision per
//! cluster decides whether the workload is active there.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use fleetgrid_types::{
    DecisionStatus, PlacementConflict, PlacementDecision, PlacementStatistics, ResolutionStatus,
    WorkloadReference,
};

use crate::conflict::{ConflictRules, classify};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no ledger for workload {0}")]
    UnknownWorkload(String),

    #[error("workload {workload} has no conflict {id}")]
    UnknownConflict { workload: String, id: u64 },

    #[error("conflict {id} cannot move from {from} to {to}")]
    Regression {
        id: u64,
        from: ResolutionStatus,
        to: ResolutionStatus,
    },

    #[error("conflict {id} is still {status}; only resolved or failed conflicts can be reopened")]
    NotTerminal { id: u64, status: ResolutionStatus },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of appending one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Position of the decision in the workload's history.
    pub index: usize,
    pub conflict: Option<PlacementConflict>,
}

/// Point-in-time copy of one workload's records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub workload: WorkloadReference,
    pub decisions: Vec<PlacementDecision>,
    pub conflicts: Vec<PlacementConflict>,
    pub statistics: PlacementStatistics,
}

impl LedgerSnapshot {
    /// Clusters whose latest decision still claims them.
    pub fn active_clusters(&self) -> BTreeSet<String> {
        active_clusters(&self.decisions)
    }

    pub fn open_conflicts(&self) -> impl Iterator<Item = &PlacementConflict> {
        self.conflicts
            .iter()
            .filter(|c| !c.resolution_status.is_terminal())
    }
}

fn active_clusters(decisions: &[PlacementDecision]) -> BTreeSet<String> {
    let mut latest: BTreeMap<&str, DecisionStatus> = BTreeMap::new();
    for d in decisions {
        latest.insert(&d.cluster_name, d.status);
    }
    latest
        .into_iter()
        .filter(|(_, status)| status.is_active())
        .map(|(name, _)| name.to_string())
        .collect()
}

fn resolution_allowed(from: ResolutionStatus, to: ResolutionStatus) -> bool {
    use ResolutionStatus::*;
    matches!(
        (from, to),
        (Detected, InProgress) | (InProgress, Resolved) | (InProgress, Failed)
    )
}

#[derive(Debug)]
struct WorkloadLedger {
    workload: WorkloadReference,
    decisions: Vec<PlacementDecision>,
    conflicts: Vec<PlacementConflict>,
    statistics: PlacementStatistics,
    next_conflict_id: u64,
}

impl WorkloadLedger {
    fn new(workload: WorkloadReference) -> Self {
        Self {
            workload,
            decisions: Vec::new(),
            conflicts: Vec::new(),
            statistics: PlacementStatistics::default(),
            next_conflict_id: 1,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_conflict_id;
        self.next_conflict_id += 1;
        id
    }

    fn conflict_mut(&mut self, id: u64) -> LedgerResult<&mut PlacementConflict> {
        let key = self.workload.key();
        self.conflicts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(LedgerError::UnknownConflict { workload: key, id })
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            workload: self.workload.clone(),
            decisions: self.decisions.clone(),
            conflicts: self.conflicts.clone(),
            statistics: self.statistics.clone(),
        }
    }
}

/// Decisions and conflicts for every workload, safe to share across threads.
#[derive(Debug, Default)]
pub struct DecisionLedger {
    workloads: RwLock<HashMap<String, Arc<Mutex<WorkloadLedger>>>>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, workload: &WorkloadReference) -> Arc<Mutex<WorkloadLedger>> {
        let key = workload.key();
        if let Some(entry) = self.workloads.read().expect("ledger lock").get(&key) {
            return Arc::clone(entry);
        }
        let mut workloads = self.workloads.write().expect("ledger lock");
        Arc::clone(
            workloads
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(WorkloadLedger::new(workload.clone())))),
        )
    }

    fn existing(&self, workload: &WorkloadReference) -> LedgerResult<Arc<Mutex<WorkloadLedger>>> {
        let key = workload.key();
        self.workloads
            .read()
            .expect("ledger lock")
            .get(&key)
            .map(Arc::clone)
            .ok_or(LedgerError::UnknownWorkload(key))
    }

    /// Append `decision` and check it against the workload's active decisions.
    ///
    /// A detected conflict is recorded as `Detected`; the decision is kept
    /// either way.
    pub fn record_decision(&self, decision: PlacementDecision, rules: &ConflictRules) -> RecordOutcome {
        let entry = self.entry(&decision.workload);
        let mut ledger = entry.lock().expect("workload ledger lock");

        let active = active_clusters(&ledger.decisions);
        let finding = classify(&decision, &active, rules);

        let previous = ledger
            .decisions
            .iter()
            .rev()
            .find(|d| d.cluster_name == decision.cluster_name)
            .map(|d| d.status);

        // Outcomes count once per cluster: Approved is a step toward
        // Executed, and repeating the same outcome adds nothing.
        let stats = &mut ledger.statistics;
        stats.total += 1;
        if previous != Some(decision.status) {
            match decision.status {
                DecisionStatus::Executed => stats.successful += 1,
                DecisionStatus::Failed | DecisionStatus::Rejected => stats.failed += 1,
                DecisionStatus::Pending | DecisionStatus::Approved => {}
            }
        }
        stats.last_updated = Some(stats.last_updated.unwrap_or(0).max(decision.decision_time));

        debug!(
            workload = %ledger.workload.key(),
            cluster = %decision.cluster_name,
            status = ?decision.status,
            score = decision.score,
            "decision recorded"
        );

        let conflict = finding.map(|finding| {
            let conflict = PlacementConflict {
                id: ledger.allocate_id(),
                conflict_type: finding.conflict_type,
                workload: decision.workload.clone(),
                clusters: finding.clusters.clone(),
                detected_at: decision.decision_time,
                resolution_status: ResolutionStatus::Detected,
                message: finding.message(),
                resolved_at: None,
                reopens: None,
            };
            warn!(
                workload = %ledger.workload.key(),
                id = conflict.id,
                kind = ?conflict.conflict_type,
                message = %conflict.message,
                "placement conflict detected"
            );
            ledger.conflicts.push(conflict.clone());
            conflict
        });

        ledger.decisions.push(decision);
        RecordOutcome {
            index: ledger.decisions.len() - 1,
            conflict,
        }
    }

    /// Move a conflict forward: Detected → InProgress → Resolved | Failed.
    pub fn advance_conflict(
        &self,
        workload: &WorkloadReference,
        id: u64,
        to: ResolutionStatus,
        now: u64,
    ) -> LedgerResult<PlacementConflict> {
        let entry = self.existing(workload)?;
        let mut ledger = entry.lock().expect("workload ledger lock");
        let conflict = ledger.conflict_mut(id)?;
        let from = conflict.resolution_status;
        if !resolution_allowed(from, to) {
            return Err(LedgerError::Regression { id, from, to });
        }
        conflict.resolution_status = to;
        if to.is_terminal() {
            conflict.resolved_at = Some(now);
        }
        info!(workload = %workload.key(), id, %from, %to, "conflict status changed");
        Ok(conflict.clone())
    }

    /// Open a new `Detected` conflict from a resolved or failed one.
    ///
    /// The original record is left untouched; the new one points back to it.
    pub fn reopen_conflict(
        &self,
        workload: &WorkloadReference,
        id: u64,
        now: u64,
    ) -> LedgerResult<PlacementConflict> {
        let entry = self.existing(workload)?;
        let mut ledger = entry.lock().expect("workload ledger lock");
        let original = ledger.conflict_mut(id)?.clone();
        if !original.resolution_status.is_terminal() {
            return Err(LedgerError::NotTerminal {
                id,
                status: original.resolution_status,
            });
        }
        let reopened = PlacementConflict {
            id: ledger.allocate_id(),
            detected_at: now,
            resolution_status: ResolutionStatus::Detected,
            resolved_at: None,
            reopens: Some(id),
            ..original
        };
        info!(workload = %workload.key(), id = reopened.id, reopens = id, "conflict reopened");
        ledger.conflicts.push(reopened.clone());
        Ok(reopened)
    }

    pub fn statistics(&self, workload: &WorkloadReference) -> LedgerResult<PlacementStatistics> {
        let entry = self.existing(workload)?;
        let ledger = entry.lock().expect("workload ledger lock");
        Ok(ledger.statistics.clone())
    }

    pub fn snapshot(&self, workload: &WorkloadReference) -> LedgerResult<LedgerSnapshot> {
        let entry = self.existing(workload)?;
        let ledger = entry.lock().expect("workload ledger lock");
        Ok(ledger.snapshot())
    }

    /// Keys of every workload with at least one record, sorted.
    pub fn workloads(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .workloads
            .read()
            .expect("ledger lock")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
