//! Validation of affinity rules and affinity/anti-affinity terms.

use fleetgrid_types::{
    AffinityRule, AffinityRules, ClusterAffinity, PREFERRED_WEIGHT_MAX, PREFERRED_WEIGHT_MIN,
    RULE_WEIGHT_MAX, RULE_WEIGHT_MIN,
};

use crate::common::{
    validate_cluster_selector, validate_dns_label, validate_non_negative, validate_optional_range,
    validate_range, validate_unique_names,
};
use crate::field::{ErrorList, FieldError, FieldPath};

pub fn validate_affinity_rule(rule: &AffinityRule, path: &FieldPath) -> ErrorList {
    let mut errs = validate_dns_label(&rule.name, &path.child("name"));
    errs.extend(validate_optional_range(
        rule.weight,
        RULE_WEIGHT_MIN,
        RULE_WEIGHT_MAX,
        &path.child("weight"),
    ));
    if let Some(constraint) = &rule.constraint {
        let p = path.child("constraint");
        errs.extend(validate_non_negative(constraint.max_latency_ms, &p.child("maxLatencyMs")));
        for key in constraint.required_labels.keys() {
            if key.trim().is_empty() {
                errs.push(FieldError::required(
                    p.child("requiredLabels"),
                    "label keys must not be empty",
                ));
            }
        }
    }
    errs
}

/// Validate every rule and require names to be unique within the list.
pub fn validate_affinity_rules(rules: &[AffinityRule], path: &FieldPath) -> ErrorList {
    let mut errs: ErrorList = rules
        .iter()
        .enumerate()
        .flat_map(|(i, rule)| validate_affinity_rule(rule, &path.index(i)))
        .collect();
    errs.extend(validate_unique_names(
        rules.iter().map(|r| r.name.as_str()),
        path,
        "name",
    ));
    errs
}

fn validate_cluster_affinity(affinity: &ClusterAffinity, path: &FieldPath) -> ErrorList {
    let mut errs = Vec::new();
    let required = path.child("required");
    for (i, term) in affinity.required.iter().enumerate() {
        errs.extend(validate_cluster_selector(Some(term), &required.index(i), true));
    }
    let preferred = path.child("preferred");
    for (i, term) in affinity.preferred.iter().enumerate() {
        let p = preferred.index(i);
        errs.extend(validate_range(
            term.weight,
            PREFERRED_WEIGHT_MIN,
            PREFERRED_WEIGHT_MAX,
            &p.child("weight"),
        ));
        errs.extend(validate_cluster_selector(Some(&term.term), &p.child("term"), true));
    }
    errs
}

pub fn validate_affinity(rules: &AffinityRules, path: &FieldPath) -> ErrorList {
    let mut errs = Vec::new();
    if let Some(affinity) = &rules.cluster_affinity {
        errs.extend(validate_cluster_affinity(affinity, &path.child("clusterAffinity")));
    }
    if let Some(anti) = &rules.cluster_anti_affinity {
        errs.extend(validate_cluster_affinity(anti, &path.child("clusterAntiAffinity")));
    }
    errs
}
