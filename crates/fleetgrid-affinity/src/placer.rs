//! Placement planning for one workload.
//!
//! Given an advanced placement spec, the workload it targets, and the
//! discovery snapshot, the placer:
//! 1. Checks the workload is selected by the placement
//! 2. Filters candidates by the cluster selector (or configured default locations)
//! 3. Drops clusters reporting no capacity
//! 4. Applies affinity terms, then affinity rules (see [`crate::engine`])
//! 5. Ranks survivors and caps the result at `maxClusters`

use tracing::{debug, info};

use fleetgrid_types::{
    AffinityRules, ClusterInfo, ClusterSelector, DecisionStatus, PlacementDecision,
    WorkloadInfo, WorkloadPlacementAdvancedSpec, WorkloadReference,
};

use crate::engine::{
    AffinityError, AffinityResult, ClusterScore, Exclusion, evaluate_affinity, evaluate_rules,
};
use crate::matcher::ClusterMatcher;

/// Operator-level defaults applied when a placement leaves them open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementOptions {
    /// Cap used when the placement sets no `maxClusters`.
    pub max_clusters: Option<u32>,
    /// Locations used when the placement's cluster selector is empty.
    pub default_locations: Vec<String>,
}

/// Ranked placement for one workload, best cluster first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    pub workload: WorkloadReference,
    pub selected: Vec<ClusterScore>,
    /// Eligible clusters cut by the cluster cap.
    pub overflow: Vec<ClusterScore>,
    pub excluded: Vec<Exclusion>,
    pub decided_at: u64,
}

impl PlacementPlan {
    pub fn cluster_names(&self) -> Vec<&str> {
        self.selected.iter().map(|s| s.cluster_name.as_str()).collect()
    }

    /// One `Pending` decision per selected cluster, in rank order.
    pub fn decisions(&self) -> Vec<PlacementDecision> {
        self.selected
            .iter()
            .enumerate()
            .map(|(rank, s)| PlacementDecision {
                workload: self.workload.clone(),
                cluster_name: s.cluster_name.clone(),
                score: s.score,
                reason: reason_for(rank, s),
                decision_time: self.decided_at,
                status: DecisionStatus::Pending,
            })
            .collect()
    }
}

fn reason_for(rank: usize, score: &ClusterScore) -> String {
    if score.matched.is_empty() {
        format!("ranked #{} with score {}", rank + 1, score.score)
    } else {
        format!(
            "ranked #{} with score {} ({})",
            rank + 1,
            score.score,
            score.matched.join(", ")
        )
    }
}

fn effective_selector(
    spec: &WorkloadPlacementAdvancedSpec,
    opts: &PlacementOptions,
) -> Option<ClusterSelector> {
    match &spec.cluster_selector {
        Some(selector) if !selector.is_empty() => Some(selector.clone()),
        _ if !opts.default_locations.is_empty() => {
            Some(ClusterSelector::by_locations(opts.default_locations.iter().cloned()))
        }
        _ => None,
    }
}

fn cluster_cap(spec: &WorkloadPlacementAdvancedSpec, opts: &PlacementOptions) -> Option<usize> {
    match spec.max_clusters {
        Some(n) if n > 0 => usize::try_from(n).ok(),
        _ => opts.max_clusters.filter(|&n| n > 0).map(|n| n as usize),
    }
}

/// Compute a placement plan for `workload` across `candidates`.
///
/// # Errors
///
/// [`AffinityError::WorkloadNotSelected`] if the spec's workload selector
/// does not match, otherwise any evaluation error from the engine.
///
/// # Panics
///
/// Panics on out-of-range weights; see [`evaluate_affinity`] and [`evaluate_rules`].
pub fn compute_placement(
    spec: &WorkloadPlacementAdvancedSpec,
    workload: &WorkloadInfo,
    candidates: &[ClusterInfo],
    matcher: &impl ClusterMatcher,
    now: u64,
    opts: &PlacementOptions,
) -> AffinityResult<PlacementPlan> {
    let workload_key = workload.reference.key();
    if let Some(selector) = &spec.workload_selector {
        if !matcher.matches_workload(selector, workload) {
            return Err(AffinityError::WorkloadNotSelected {
                workload: workload_key,
            });
        }
    }

    let selector = effective_selector(spec, opts);
    let mut excluded = Vec::new();
    let mut pool: Vec<ClusterInfo> = Vec::with_capacity(candidates.len());
    for cluster in candidates {
        let reason = if selector
            .as_ref()
            .is_some_and(|s| !matcher.matches_cluster(s, cluster))
        {
            Some("not selected by cluster selector")
        } else if !cluster.capacity_available {
            Some("no capacity available")
        } else {
            None
        };
        match reason {
            Some(reason) => {
                debug!(workload = %workload_key, cluster = %cluster.name, reason, "cluster filtered");
                excluded.push(Exclusion {
                    cluster_name: cluster.name.clone(),
                    reason: reason.to_string(),
                });
            }
            None => pool.push(cluster.clone()),
        }
    }

    let default_rules = AffinityRules::default();
    let rules = spec.affinity.as_ref().unwrap_or(&default_rules);
    let by_terms = evaluate_affinity(rules, &pool, matcher)?;
    let survivors: Vec<ClusterInfo> = pool
        .into_iter()
        .filter(|c| by_terms.is_eligible(&c.name))
        .collect();
    let by_rules = evaluate_rules(&spec.affinity_rules, &survivors)?;
    let evaluation = by_terms.merge(by_rules);

    let mut ranked = evaluation.ranked();
    let overflow = match cluster_cap(spec, opts) {
        Some(cap) if ranked.len() > cap => ranked.split_off(cap),
        _ => Vec::new(),
    };
    excluded.extend(evaluation.excluded);

    info!(
        workload = %workload_key,
        selected = ranked.len(),
        overflow = overflow.len(),
        excluded = excluded.len(),
        "computed placement"
    );

    Ok(PlacementPlan {
        workload: workload.reference.clone(),
        selected: ranked,
        overflow,
        excluded,
        decided_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::LabelMatcher;
    use fleetgrid_types::{
        AffinityRule, AffinityRuleType, ClusterAffinity, LabelSelector, WeightedClusterTerm,
        WorkloadSelector, WorkloadType,
    };
    use std::collections::BTreeMap;

    fn workload() -> WorkloadInfo {
        WorkloadInfo {
            reference: WorkloadReference::new("apps/v1", "Deployment", "checkout", Some("shop")),
            labels: BTreeMap::new(),
            namespace_labels: BTreeMap::new(),
        }
    }

    fn deployments() -> WorkloadSelector {
        WorkloadSelector {
            workload_types: vec![WorkloadType {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
            }],
            ..Default::default()
        }
    }

    fn fleet() -> Vec<ClusterInfo> {
        vec![
            ClusterInfo::new("c1").with_location("eu-west").with_label("tier", "gold"),
            ClusterInfo::new("c2").with_location("eu-west"),
            ClusterInfo::new("c3").with_location("us-east").with_label("tier", "gold"),
        ]
    }

    fn prefer_gold() -> AffinityRules {
        AffinityRules {
            cluster_affinity: Some(ClusterAffinity {
                required: vec![],
                preferred: vec![WeightedClusterTerm {
                    weight: 50,
                    term: ClusterSelector::by_labels(LabelSelector::from_labels([("tier", "gold")])),
                }],
            }),
            cluster_anti_affinity: None,
        }
    }

    #[test]
    fn ranks_by_score_then_name() {
        let spec = WorkloadPlacementAdvancedSpec {
            workload_selector: Some(deployments()),
            affinity: Some(prefer_gold()),
            ..Default::default()
        };
        let plan = compute_placement(&spec, &workload(), &fleet(), &LabelMatcher, 100, &PlacementOptions::default())
            .unwrap();
        assert_eq!(plan.cluster_names(), vec!["c1", "c3", "c2"]);

        let decisions = plan.decisions();
        assert_eq!(decisions.len(), 3);
        assert!(decisions.iter().all(|d| d.status == DecisionStatus::Pending));
        assert!(decisions.iter().all(|d| d.decision_time == 100));
        assert_eq!(decisions[0].score, 50);
        assert!(decisions[0].reason.contains("preferred affinity term 0"));
    }

    #[test]
    fn empty_selector_falls_back_to_default_locations() {
        let spec = WorkloadPlacementAdvancedSpec {
            workload_selector: Some(deployments()),
            cluster_selector: Some(ClusterSelector::default()),
            ..Default::default()
        };
        let opts = PlacementOptions {
            max_clusters: None,
            default_locations: vec!["us-east".to_string()],
        };
        let plan = compute_placement(&spec, &workload(), &fleet(), &LabelMatcher, 0, &opts).unwrap();
        assert_eq!(plan.cluster_names(), vec!["c3"]);
        assert_eq!(plan.excluded.len(), 2);
    }

    #[test]
    fn spec_cap_wins_over_configured_cap() {
        let spec = WorkloadPlacementAdvancedSpec {
            workload_selector: Some(deployments()),
            affinity: Some(prefer_gold()),
            max_clusters: Some(1),
            ..Default::default()
        };
        let opts = PlacementOptions {
            max_clusters: Some(2),
            default_locations: vec![],
        };
        let plan = compute_placement(&spec, &workload(), &fleet(), &LabelMatcher, 0, &opts).unwrap();
        assert_eq!(plan.cluster_names(), vec!["c1"]);
        assert_eq!(plan.overflow.len(), 2);

        let uncapped = WorkloadPlacementAdvancedSpec { max_clusters: Some(0), ..spec };
        let plan = compute_placement(&uncapped, &workload(), &fleet(), &LabelMatcher, 0, &opts).unwrap();
        assert_eq!(plan.selected.len(), 2);
    }

    #[test]
    fn clusters_without_capacity_are_excluded() {
        let mut clusters = fleet();
        clusters[0].capacity_available = false;
        let spec = WorkloadPlacementAdvancedSpec::default();
        let plan = compute_placement(&spec, &workload(), &clusters, &LabelMatcher, 0, &PlacementOptions::default())
            .unwrap();
        assert_eq!(plan.cluster_names(), vec!["c2", "c3"]);
        assert_eq!(plan.excluded[0].cluster_name, "c1");
    }

    #[test]
    fn unselected_workload_is_an_error() {
        let mut selector = deployments();
        selector.workload_types[0].kind = "StatefulSet".to_string();
        let spec = WorkloadPlacementAdvancedSpec {
            workload_selector: Some(selector),
            ..Default::default()
        };
        let err = compute_placement(&spec, &workload(), &fleet(), &LabelMatcher, 0, &PlacementOptions::default())
            .unwrap_err();
        assert!(matches!(err, AffinityError::WorkloadNotSelected { .. }));
    }

    #[test]
    fn rules_apply_after_terms() {
        let spec = WorkloadPlacementAdvancedSpec {
            affinity: Some(prefer_gold()),
            affinity_rules: vec![
                AffinityRule::new("eu-only", AffinityRuleType::Constraint).with_constraint(
                    fleetgrid_types::AffinityConstraint {
                        required_labels: [("tier".to_string(), "gold".to_string())].into(),
                        max_latency_ms: None,
                    },
                ),
            ],
            cluster_selector: Some(ClusterSelector::by_locations(["eu-west"])),
            ..Default::default()
        };
        let plan = compute_placement(&spec, &workload(), &fleet(), &LabelMatcher, 0, &PlacementOptions::default())
            .unwrap();
        assert_eq!(plan.cluster_names(), vec!["c1"]);
        assert_eq!(plan.selected[0].score, 50);
    }

    #[test]
    fn nothing_left_is_an_error() {
        let spec = WorkloadPlacementAdvancedSpec {
            cluster_selector: Some(ClusterSelector::by_locations(["ap-south"])),
            ..Default::default()
        };
        let err = compute_placement(&spec, &workload(), &fleet(), &LabelMatcher, 0, &PlacementOptions::default())
            .unwrap_err();
        assert_eq!(err, AffinityError::NoEligibleClusters);
    }
}
