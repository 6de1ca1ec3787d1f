//! Session-affinity policies and stickiness configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::affinity::AffinityRule;
use crate::meta::Object;
use crate::selector::{ClusterSelector, WorkloadSelector};

/// Bounds for [`StickinessPolicy::max_bindings`].
pub const MAX_BINDINGS_MIN: i32 = 0;
pub const MAX_BINDINGS_MAX: i32 = 10;
/// Bounds for [`RebalancingPolicy::load_imbalance_threshold`] when non-zero.
pub const IMBALANCE_THRESHOLD_MIN: i32 = 10;
pub const IMBALANCE_THRESHOLD_MAX: i32 = 90;

/// How strongly a session is pinned to its cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StickinessType {
    /// Best effort; the binding may move under load.
    #[default]
    Soft,
    /// The binding holds until it expires.
    Hard,
    /// Soft under imbalance, hard otherwise.
    Adaptive,
}

/// Moves sessions off overloaded clusters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalancingPolicy {
    /// Percent imbalance that triggers rebalancing. `0` disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_imbalance_threshold: Option<i32>,
    /// Minimum time between rebalancing passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval: Option<String>,
}

impl RebalancingPolicy {
    pub fn is_enabled(&self) -> bool {
        self.load_imbalance_threshold.unwrap_or(0) != 0
    }
}

/// Stickiness configuration for session bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickinessPolicy {
    #[serde(rename = "type", default)]
    pub stickiness_type: StickinessType,
    /// Binding lifetime, e.g. `"30m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Maximum concurrent bindings per session; `0` means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bindings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebalancing: Option<RebalancingPolicy>,
}

/// Where the session identifier is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionIdentification {
    Cookie { name: String },
    Header { name: String },
    SourceIp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAffinityPolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_selector: Option<WorkloadSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_selector: Option<ClusterSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_identification: Option<SessionIdentification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affinity_rules: Vec<AffinityRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stickiness: Option<StickinessPolicy>,
}

/// Session counters derived from the binding set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetrics {
    /// Distinct sessions seen across all bindings.
    pub total_sessions: u64,
    /// Distinct sessions holding at least one active binding.
    pub active_sessions: u64,
    pub expired_bindings: u64,
    pub superseded_bindings: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAffinityPolicyStatus {
    #[serde(default)]
    pub observed_generation: u64,
    #[serde(default)]
    pub active_bindings: u64,
    /// Active bindings per target cluster.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_bindings: BTreeMap<String, u64>,
    #[serde(default)]
    pub connection_metrics: ConnectionMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_score: Option<i32>,
}

pub type SessionAffinityPolicy = Object<SessionAffinityPolicySpec, SessionAffinityPolicyStatus>;
