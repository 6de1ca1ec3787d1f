//! Affinity and anti-affinity rule declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::selector::ClusterSelector;

/// Lower bound of an [`AffinityRule`] weight.
pub const RULE_WEIGHT_MIN: i32 = 0;
/// Upper bound of an [`AffinityRule`] weight.
pub const RULE_WEIGHT_MAX: i32 = 100;
/// Lower bound of a preferred term weight.
pub const PREFERRED_WEIGHT_MIN: i32 = 1;
/// Upper bound of a preferred term weight.
pub const PREFERRED_WEIGHT_MAX: i32 = 100;

/// How an [`AffinityRule`] participates in placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffinityRuleType {
    /// Hard filter: clusters violating the constraint are dropped.
    Constraint,
    /// Soft: satisfying clusters gain the rule's weight.
    Preference,
    /// Hard and fail-closed: at least one candidate must satisfy it.
    Requirement,
}

/// Structured predicate carried by an [`AffinityRule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityConstraint {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency_ms: Option<i32>,
}

/// A named affinity rule owned by exactly one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityRule {
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: AffinityRuleType,
    /// Weight in `[0, 100]`; `None` and `Some(0)` both mean "unset".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<AffinityConstraint>,
}

impl AffinityRule {
    pub fn new(name: &str, rule_type: AffinityRuleType) -> Self {
        Self {
            name: name.to_string(),
            rule_type,
            weight: None,
            constraint: None,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_constraint(mut self, constraint: AffinityConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Effective weight, treating unset as zero.
    pub fn effective_weight(&self) -> i32 {
        self.weight.unwrap_or(0)
    }
}

/// A soft affinity term contributing `weight` to a cluster's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedClusterTerm {
    pub weight: i32,
    pub term: ClusterSelector,
}

/// Required (hard) and preferred (soft) terms for one affinity direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAffinity {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<ClusterSelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred: Vec<WeightedClusterTerm>,
}

/// Affinity and anti-affinity for an advanced placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_affinity: Option<ClusterAffinity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_anti_affinity: Option<ClusterAffinity>,
}
