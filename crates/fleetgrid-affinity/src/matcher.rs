//! Selector matching.
//!
//! A selector matches when every populated branch matches; an empty
//! branch places no restriction. Label selectors follow the usual
//! semantics: `matchLabels` entries must be present with equal values,
//! and every expression must hold.

use std::collections::BTreeMap;

use fleetgrid_types::{
    ClusterInfo, ClusterSelector, LabelSelector, LabelSelectorRequirement, SelectorOperator,
    WorkloadInfo, WorkloadSelector,
};

/// Decides whether clusters and workloads fall under a selector.
///
/// The engine only depends on this trait, so callers with richer
/// discovery data can plug in their own matcher.
pub trait ClusterMatcher {
    fn matches_cluster(&self, selector: &ClusterSelector, cluster: &ClusterInfo) -> bool;

    fn matches_workload(&self, selector: &WorkloadSelector, workload: &WorkloadInfo) -> bool;
}

/// Matches on labels, locations, and names carried by the snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelMatcher;

impl ClusterMatcher for LabelMatcher {
    fn matches_cluster(&self, selector: &ClusterSelector, cluster: &ClusterInfo) -> bool {
        if let Some(labels) = &selector.label_selector {
            if !label_selector_matches(labels, &cluster.labels) {
                return false;
            }
        }
        if !selector.locations.is_empty() {
            let located = cluster
                .location
                .as_ref()
                .is_some_and(|loc| selector.locations.contains(loc));
            if !located {
                return false;
            }
        }
        selector.cluster_names.is_empty() || selector.cluster_names.contains(&cluster.name)
    }

    fn matches_workload(&self, selector: &WorkloadSelector, workload: &WorkloadInfo) -> bool {
        if let Some(labels) = &selector.label_selector {
            if !label_selector_matches(labels, &workload.labels) {
                return false;
            }
        }
        if !selector.workload_types.is_empty()
            && !selector.workload_types.contains(&workload.reference.workload_type())
        {
            return false;
        }
        match &selector.namespace_selector {
            Some(ns) => label_selector_matches(ns, &workload.namespace_labels),
            None => true,
        }
    }
}

fn requirement_matches(req: &LabelSelectorRequirement, labels: &BTreeMap<String, String>) -> bool {
    let value = labels.get(&req.key);
    match req.operator {
        SelectorOperator::In => value.is_some_and(|v| req.values.contains(v)),
        SelectorOperator::NotIn => value.is_none_or(|v| !req.values.contains(v)),
        SelectorOperator::Exists => value.is_some(),
        SelectorOperator::DoesNotExist => value.is_none(),
    }
}

/// Evaluate a label selector against a label set. An empty selector matches everything.
pub fn label_selector_matches(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> bool {
    selector
        .match_labels
        .iter()
        .all(|(k, v)| labels.get(k).is_some_and(|lv| lv == v))
        && selector
            .match_expressions
            .iter()
            .all(|req| requirement_matches(req, labels))
}
