//! Validation of session-affinity policies and stickiness settings.

use fleetgrid_types::{
    IMBALANCE_THRESHOLD_MAX, IMBALANCE_THRESHOLD_MIN, MAX_BINDINGS_MAX, MAX_BINDINGS_MIN,
    SessionAffinityPolicy, SessionIdentification, StickinessPolicy,
};

use crate::affinity::validate_affinity_rules;
use crate::common::{
    validate_cluster_selector, validate_duration, validate_metadata, validate_optional_range,
    validate_required_string, validate_workload_selector,
};
use crate::field::{ErrorList, FieldPath};

pub fn validate_stickiness_policy(policy: &StickinessPolicy, path: &FieldPath) -> ErrorList {
    let mut errs = validate_duration(policy.duration.as_deref(), &path.child("duration"));
    errs.extend(validate_optional_range(
        policy.max_bindings,
        MAX_BINDINGS_MIN,
        MAX_BINDINGS_MAX,
        &path.child("maxBindings"),
    ));
    if let Some(rebalancing) = &policy.rebalancing {
        let p = path.child("rebalancing");
        // Zero disables rebalancing, so the range only applies when enabled.
        errs.extend(validate_optional_range(
            rebalancing.load_imbalance_threshold,
            IMBALANCE_THRESHOLD_MIN,
            IMBALANCE_THRESHOLD_MAX,
            &p.child("loadImbalanceThreshold"),
        ));
        errs.extend(validate_duration(
            rebalancing.min_interval.as_deref(),
            &p.child("minInterval"),
        ));
    }
    errs
}

fn validate_session_identification(ident: &SessionIdentification, path: &FieldPath) -> ErrorList {
    match ident {
        SessionIdentification::Cookie { name } => {
            validate_required_string(name, &path.child("name"), "cookie name")
        }
        SessionIdentification::Header { name } => {
            validate_required_string(name, &path.child("name"), "header name")
        }
        SessionIdentification::SourceIp => Vec::new(),
    }
}

pub fn validate_session_affinity_policy(policy: &SessionAffinityPolicy) -> ErrorList {
    let mut errs = validate_metadata(&policy.metadata, &FieldPath::new("metadata"));
    let spec = FieldPath::new("spec");
    let s = &policy.spec;

    errs.extend(validate_workload_selector(
        s.workload_selector.as_ref(),
        &spec.child("workloadSelector"),
        true,
    ));
    errs.extend(validate_cluster_selector(
        s.cluster_selector.as_ref(),
        &spec.child("clusterSelector"),
        true,
    ));
    if let Some(ident) = &s.session_identification {
        errs.extend(validate_session_identification(
            ident,
            &spec.child("sessionIdentification"),
        ));
    }
    errs.extend(validate_affinity_rules(&s.affinity_rules, &spec.child("affinityRules")));
    if let Some(stickiness) = &s.stickiness {
        errs.extend(validate_stickiness_policy(stickiness, &spec.child("stickiness")));
    }
    errs
}
