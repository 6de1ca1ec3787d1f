//! Advanced placement policy, placement decisions, and conflicts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::affinity::{AffinityRule, AffinityRules};
use crate::meta::Object;
use crate::rollout::{RolloutState, RolloutStrategy};
use crate::selector::{ClusterSelector, WorkloadReference, WorkloadSelector};
use crate::traffic::{TrafficSplitting, TrafficStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadPlacementAdvancedSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_selector: Option<WorkloadSelector>,
    /// Optional here; an empty selector falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_selector: Option<ClusterSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<AffinityRules>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affinity_rules: Vec<AffinityRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_strategy: Option<RolloutStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_splitting: Option<TrafficSplitting>,
    /// Upper bound on clusters selected; `0` means no bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_clusters: Option<i32>,
}

/// Lifecycle of a single placement decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Executed,
    Failed,
}

impl DecisionStatus {
    /// Whether the decision still claims its cluster.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Executed)
    }
}

/// Outcome of placing one workload on one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementDecision {
    pub workload: WorkloadReference,
    pub cluster_name: String,
    /// Relative ranking only; higher is better.
    pub score: i64,
    pub reason: String,
    pub decision_time: u64,
    #[serde(rename = "decisionStatus")]
    pub status: DecisionStatus,
}

/// Kind of inconsistency between decisions.
///
/// Declaration order is reporting precedence, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictType {
    Resource,
    Policy,
    Dependency,
    Affinity,
}

impl ConflictType {
    /// Higher wins when several kinds are violated at once.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Resource => 4,
            Self::Policy => 3,
            Self::Dependency => 2,
            Self::Affinity => 1,
        }
    }
}

/// Resolution progress of a conflict. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    #[default]
    Detected,
    InProgress,
    Resolved,
    Failed,
}

impl ResolutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Detected => "Detected",
            Self::InProgress => "InProgress",
            Self::Resolved => "Resolved",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConflict {
    /// Ledger-assigned id, unique per workload.
    pub id: u64,
    pub conflict_type: ConflictType,
    pub workload: WorkloadReference,
    pub clusters: BTreeSet<String>,
    pub detected_at: u64,
    pub resolution_status: ResolutionStatus,
    #[serde(default)]
    pub message: String,
    /// When the conflict reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<u64>,
    /// Set when this record reopens an earlier, terminal conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopens: Option<u64>,
}

/// Monotonic placement counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementStatistics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadPlacementAdvancedStatus {
    #[serde(default)]
    pub observed_generation: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<PlacementDecision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<PlacementConflict>,
    #[serde(default)]
    pub statistics: PlacementStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout: Option<RolloutState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficStatus>,
}

pub type WorkloadPlacementAdvanced = Object<WorkloadPlacementAdvancedSpec, WorkloadPlacementAdvancedStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_follows_declaration_order() {
        assert!(ConflictType::Resource.precedence() > ConflictType::Policy.precedence());
        assert!(ConflictType::Policy.precedence() > ConflictType::Dependency.precedence());
        assert!(ConflictType::Dependency.precedence() > ConflictType::Affinity.precedence());
    }

    #[test]
    fn decision_status_uses_wire_field_name() {
        let decision = PlacementDecision {
            workload: WorkloadReference::new("apps/v1", "Deployment", "api", None),
            cluster_name: "c1".to_string(),
            score: 10,
            reason: "affinity".to_string(),
            decision_time: 100,
            status: DecisionStatus::Approved,
        };
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["decisionStatus"], "Approved");
        assert_eq!(value["clusterName"], "c1");
    }

    #[test]
    fn only_live_decisions_are_active() {
        assert!(DecisionStatus::Executed.is_active());
        assert!(!DecisionStatus::Rejected.is_active());
        assert!(!DecisionStatus::Failed.is_active());
    }
}
