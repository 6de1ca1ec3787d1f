//! Validation of advanced placements, traffic splits, and rollout settings.

use fleetgrid_types::{
    IntOrPercent, RolloutState, RolloutStrategy, TRAFFIC_WEIGHT_TOTAL, TrafficSplitting,
    WorkloadPlacementAdvanced,
};

use crate::affinity::{validate_affinity, validate_affinity_rules};
use crate::common::{
    validate_cluster_selector, validate_dns_label, validate_duration, validate_metadata,
    validate_non_negative, validate_range, validate_unique_names, validate_workload_selector,
};
use crate::field::{ErrorList, FieldError, FieldPath};

/// Per-entry bounds plus the sum-to-100 invariant for non-empty splits.
///
/// An empty split is "unset" and passes.
pub fn validate_traffic_splitting(split: &TrafficSplitting, path: &FieldPath) -> ErrorList {
    let clusters = path.child("clusters");
    let mut errs = Vec::new();
    for (i, entry) in split.clusters.iter().enumerate() {
        let p = clusters.index(i);
        errs.extend(validate_dns_label(&entry.cluster_name, &p.child("clusterName")));
        errs.extend(validate_range(entry.weight, 0, 100, &p.child("weight")));
    }
    errs.extend(validate_unique_names(
        split.clusters.iter().map(|c| c.cluster_name.as_str()),
        &clusters,
        "clusterName",
    ));
    if !split.is_unset() {
        let total = split.total_weight();
        if total != TRAFFIC_WEIGHT_TOTAL {
            errs.push(FieldError::invalid(
                clusters,
                total,
                format!("weights must sum to {TRAFFIC_WEIGHT_TOTAL}"),
            ));
        }
    }
    errs
}

fn validate_int_or_percent(value: &IntOrPercent, path: &FieldPath) -> ErrorList {
    match value {
        IntOrPercent::Int(n) => validate_non_negative(Some(*n), path),
        IntOrPercent::Percent(s) => match value.percent() {
            Some(pct) => validate_range(pct, 0, 100, path),
            None => vec![FieldError::invalid(
                path.clone(),
                s,
                "must be an integer or a percentage such as \"25%\"",
            )],
        },
    }
}

pub fn validate_rollout_strategy(strategy: &RolloutStrategy, path: &FieldPath) -> ErrorList {
    let mut errs = Vec::new();
    match strategy {
        RolloutStrategy::RollingUpdate {
            max_unavailable,
            max_surge,
        } => {
            if let Some(v) = max_unavailable {
                errs.extend(validate_int_or_percent(v, &path.child("maxUnavailable")));
            }
            if let Some(v) = max_surge {
                errs.extend(validate_int_or_percent(v, &path.child("maxSurge")));
            }
        }
        RolloutStrategy::BlueGreen {
            scale_down_delay, ..
        } => {
            errs.extend(validate_duration(
                scale_down_delay.as_deref(),
                &path.child("scaleDownDelay"),
            ));
        }
        RolloutStrategy::Canary { steps } => {
            let steps_path = path.child("steps");
            if steps.is_empty() {
                errs.push(FieldError::required(
                    steps_path.clone(),
                    "a canary rollout needs at least one step",
                ));
            }
            let mut previous = 0;
            for (i, step) in steps.iter().enumerate() {
                let p = steps_path.index(i);
                errs.extend(validate_range(step.weight, 0, 100, &p.child("weight")));
                if step.weight < previous {
                    errs.push(FieldError::invalid(
                        p.child("weight"),
                        step.weight,
                        format!("must not be lower than the previous step ({previous})"),
                    ));
                }
                previous = previous.max(step.weight);
                errs.extend(validate_duration(step.pause.as_deref(), &p.child("pause")));
            }
        }
    }
    errs
}

pub fn validate_rollout_state(state: &RolloutState, path: &FieldPath) -> ErrorList {
    if state.current_step > state.total_steps {
        vec![FieldError::invalid(
            path.child("currentStep"),
            state.current_step,
            format!("must not exceed totalSteps ({})", state.total_steps),
        )]
    } else {
        Vec::new()
    }
}

pub fn validate_workload_placement_advanced(placement: &WorkloadPlacementAdvanced) -> ErrorList {
    let mut errs = validate_metadata(&placement.metadata, &FieldPath::new("metadata"));
    let spec = FieldPath::new("spec");
    let s = &placement.spec;

    errs.extend(validate_workload_selector(
        s.workload_selector.as_ref(),
        &spec.child("workloadSelector"),
        true,
    ));
    // Optional: an empty cluster selector is filled in by the placement default.
    errs.extend(validate_cluster_selector(
        s.cluster_selector.as_ref(),
        &spec.child("clusterSelector"),
        false,
    ));
    if let Some(affinity) = &s.affinity {
        errs.extend(validate_affinity(affinity, &spec.child("affinity")));
    }
    errs.extend(validate_affinity_rules(&s.affinity_rules, &spec.child("affinityRules")));
    if let Some(strategy) = &s.rollout_strategy {
        errs.extend(validate_rollout_strategy(strategy, &spec.child("rolloutStrategy")));
    }
    if let Some(split) = &s.traffic_splitting {
        errs.extend(validate_traffic_splitting(split, &spec.child("trafficSplitting")));
    }
    errs.extend(validate_non_negative(s.max_clusters, &spec.child("maxClusters")));

    if let Some(rollout) = &placement.status.rollout {
        errs.extend(validate_rollout_state(
            rollout,
            &FieldPath::new("status").child("rollout"),
        ));
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldErrorKind;
    use fleetgrid_types::CanaryStep;

    fn split_path() -> FieldPath {
        FieldPath::new("spec").child("trafficSplitting")
    }

    #[test]
    fn split_summing_to_100_is_accepted() {
        let split = TrafficSplitting::from_weights([("a", 50), ("b", 30), ("c", 20)]);
        assert!(validate_traffic_splitting(&split, &split_path()).is_empty());
    }

    #[test]
    fn split_summing_to_90_is_rejected() {
        let split = TrafficSplitting::from_weights([("a", 50), ("b", 30), ("c", 10)]);
        let errs = validate_traffic_splitting(&split, &split_path());
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, FieldErrorKind::Invalid);
        assert_eq!(errs[0].value.as_deref(), Some("90"));
        assert_eq!(errs[0].path.to_string(), "spec.trafficSplitting.clusters");
    }

    #[test]
    fn empty_split_is_unset() {
        assert!(validate_traffic_splitting(&TrafficSplitting::default(), &split_path()).is_empty());
    }

    #[test]
    fn duplicate_cluster_in_split() {
        let split = TrafficSplitting::from_weights([("a", 50), ("a", 50)]);
        let errs = validate_traffic_splitting(&split, &split_path());
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, FieldErrorKind::Duplicate);
    }

    #[test]
    fn rolling_update_percentages() {
        let ok = RolloutStrategy::RollingUpdate {
            max_unavailable: Some(IntOrPercent::Percent("25%".to_string())),
            max_surge: Some(IntOrPercent::Int(2)),
        };
        assert!(validate_rollout_strategy(&ok, &FieldPath::new("s")).is_empty());

        let bad = RolloutStrategy::RollingUpdate {
            max_unavailable: Some(IntOrPercent::Percent("150%".to_string())),
            max_surge: Some(IntOrPercent::Percent("many".to_string())),
        };
        let errs = validate_rollout_strategy(&bad, &FieldPath::new("s"));
        let paths: Vec<String> = errs.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["s.maxUnavailable", "s.maxSurge"]);
    }

    #[test]
    fn canary_steps_must_not_shrink() {
        let strategy = RolloutStrategy::Canary {
            steps: vec![
                CanaryStep { weight: 10, pause: Some("5m".to_string()) },
                CanaryStep { weight: 5, pause: None },
                CanaryStep { weight: 100, pause: None },
            ],
        };
        let errs = validate_rollout_strategy(&strategy, &FieldPath::new("s"));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path.to_string(), "s.steps[1].weight");
    }

    #[test]
    fn canary_without_steps_is_required() {
        let errs = validate_rollout_strategy(&RolloutStrategy::Canary { steps: vec![] }, &FieldPath::new("s"));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, FieldErrorKind::Required);
    }

    #[test]
    fn current_step_cannot_pass_total() {
        let state = RolloutState {
            current_step: 4,
            total_steps: 3,
            ..Default::default()
        };
        assert_eq!(validate_rollout_state(&state, &FieldPath::new("status")).len(), 1);
    }
}
