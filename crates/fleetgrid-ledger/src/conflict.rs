//! Conflict detection between a new decision and the decisions before it.
//!
//! Every rule a decision breaks is collected, and the finding is reported
//! under the kind with the highest precedence:
//! Resource > Policy > Dependency > Affinity.

use std::collections::BTreeSet;

use fleetgrid_types::{ConflictType, PlacementDecision};

/// Constraints a new decision is checked against, supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictRules {
    /// The workload may be active on at most one cluster.
    pub exclusive: bool,
    /// Groups of clusters that must not host the workload together.
    pub anti_affinity_groups: Vec<BTreeSet<String>>,
    /// Clusters without capacity for the workload.
    pub exhausted_clusters: BTreeSet<String>,
    /// Clusters a policy forbids for the workload.
    pub denied_clusters: BTreeSet<String>,
    /// Dependencies of the workload not available on the cluster.
    pub unsatisfied_dependencies: Vec<String>,
}

/// A detected conflict before the ledger assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictFinding {
    pub conflict_type: ConflictType,
    /// The new decision's cluster plus every cluster it clashes with.
    pub clusters: BTreeSet<String>,
    /// Every violated rule, highest precedence first.
    pub violations: Vec<(ConflictType, String)>,
}

impl ConflictFinding {
    pub fn message(&self) -> String {
        self.violations
            .iter()
            .map(|(_, msg)| msg.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Check `decision` against the clusters the workload is already active on.
///
/// Inactive decisions (Rejected, Failed) never conflict.
pub fn classify(
    decision: &PlacementDecision,
    active_clusters: &BTreeSet<String>,
    rules: &ConflictRules,
) -> Option<ConflictFinding> {
    if !decision.status.is_active() {
        return None;
    }
    let cluster = &decision.cluster_name;
    let others: BTreeSet<&String> = active_clusters.iter().filter(|c| *c != cluster).collect();

    let mut clusters = BTreeSet::from([cluster.clone()]);
    let mut violations = Vec::new();

    if rules.exhausted_clusters.contains(cluster) {
        violations.push((ConflictType::Resource, format!("cluster {cluster} has no capacity left")));
    }
    if rules.denied_clusters.contains(cluster) {
        violations.push((ConflictType::Policy, format!("policy denies cluster {cluster}")));
    }
    if rules.exclusive && !others.is_empty() {
        clusters.extend(others.iter().map(|c| (*c).clone()));
        violations.push((
            ConflictType::Policy,
            format!("exclusive workload already active on {}", join(&others)),
        ));
    }
    if !rules.unsatisfied_dependencies.is_empty() {
        violations.push((
            ConflictType::Dependency,
            format!(
                "unsatisfied dependencies on {cluster}: {}",
                rules.unsatisfied_dependencies.join(", ")
            ),
        ));
    }
    for group in rules.anti_affinity_groups.iter().filter(|g| g.contains(cluster)) {
        let clashing: BTreeSet<&String> = others
            .iter()
            .copied()
            .filter(|c| group.contains(*c))
            .collect();
        if !clashing.is_empty() {
            clusters.extend(clashing.iter().map(|c| (*c).clone()));
            violations.push((
                ConflictType::Affinity,
                format!("anti-affinity between {cluster} and {}", join(&clashing)),
            ));
        }
    }

    if violations.is_empty() {
        return None;
    }
    violations.sort_by_key(|(kind, _)| std::cmp::Reverse(kind.precedence()));
    Some(ConflictFinding {
        conflict_type: violations[0].0,
        clusters,
        violations,
    })
}

fn join(names: &BTreeSet<&String>) -> String {
    names
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
