//! Validation of sticky bindings and session-binding constraints.

use fleetgrid_types::{
    BINDING_WEIGHT_MAX, BINDING_WEIGHT_MIN, ConstraintExemption, ConstraintTarget, ConstraintType,
    ExemptionCondition, HEALTH_SCORE_MAX, HEALTH_SCORE_MIN, MAX_VIOLATIONS_MAX, MAX_VIOLATIONS_MIN,
    SessionBindingConstraint, StickyBinding, TargetType,
};

use crate::common::{
    validate_dns_label, validate_label_selector, validate_metadata, validate_non_negative,
    validate_optional_range, validate_range, validate_required_string, validate_unique_names,
};
use crate::field::{ErrorList, FieldError, FieldPath};

pub fn validate_sticky_binding(binding: &StickyBinding) -> ErrorList {
    let mut errs = validate_metadata(&binding.metadata, &FieldPath::new("metadata"));
    let spec = FieldPath::new("spec");
    let s = &binding.spec;

    errs.extend(validate_required_string(
        &s.session_identifier,
        &spec.child("sessionIdentifier"),
        "sessionIdentifier",
    ));
    if s.target_cluster.is_empty() {
        errs.extend(validate_required_string(
            &s.target_cluster,
            &spec.child("targetCluster"),
            "targetCluster",
        ));
    } else {
        errs.extend(validate_dns_label(&s.target_cluster, &spec.child("targetCluster")));
    }
    errs.extend(validate_optional_range(
        s.weight,
        BINDING_WEIGHT_MIN,
        BINDING_WEIGHT_MAX,
        &spec.child("weight"),
    ));
    if let Some(expires_at) = s.expires_at {
        if expires_at < s.created_at {
            errs.push(FieldError::invalid(
                spec.child("expiresAt"),
                expires_at,
                format!("must not be earlier than createdAt ({})", s.created_at),
            ));
        }
    }
    if let Some(renewal) = &s.auto_renewal {
        let p = spec.child("autoRenewal");
        errs.extend(validate_optional_range(
            renewal.renewal_threshold_percent,
            0,
            100,
            &p.child("renewalThresholdPercent"),
        ));
        errs.extend(validate_non_negative(renewal.max_renewals, &p.child("maxRenewals")));
    }
    errs
}

pub fn validate_constraint_target(target: &ConstraintTarget, path: &FieldPath) -> ErrorList {
    if target.is_empty() {
        return vec![FieldError::required(
            path.clone(),
            "either selector or names must be specified",
        )];
    }
    let mut errs = Vec::new();
    if let Some(selector) = &target.selector {
        errs.extend(validate_label_selector(selector, &path.child("selector")));
    }
    let names = path.child("names");
    for (i, name) in target.names.iter().enumerate() {
        match target.target_type {
            TargetType::Cluster => errs.extend(validate_dns_label(name, &names.index(i))),
            TargetType::Session | TargetType::Workload => {
                errs.extend(validate_required_string(name, &names.index(i), "name"))
            }
        }
    }
    errs
}

fn validate_condition(condition: &ExemptionCondition, path: &FieldPath) -> ErrorList {
    match condition {
        ExemptionCondition::HealthBelow { score } => validate_range(
            *score,
            HEALTH_SCORE_MIN,
            HEALTH_SCORE_MAX,
            &path.child("score"),
        ),
        ExemptionCondition::LoadAbove { percent } => {
            validate_range(*percent, 0, 100, &path.child("percent"))
        }
        ExemptionCondition::Maintenance => Vec::new(),
        ExemptionCondition::TimeWindow { start, end } => {
            if end <= start {
                vec![FieldError::invalid(
                    path.child("end"),
                    end,
                    format!("must be later than start ({start})"),
                )]
            } else {
                Vec::new()
            }
        }
    }
}

/// An exemption is never valid without both a name and a reason.
pub fn validate_exemption(exemption: &ConstraintExemption, path: &FieldPath) -> ErrorList {
    let mut errs = validate_required_string(&exemption.name, &path.child("name"), "exemption name");
    errs.extend(validate_required_string(
        &exemption.reason,
        &path.child("reason"),
        "exemption reason",
    ));
    if let Some(target) = &exemption.target {
        errs.extend(validate_constraint_target(target, &path.child("target")));
    }
    let conditions = path.child("conditions");
    for (i, condition) in exemption.conditions.iter().enumerate() {
        errs.extend(validate_condition(condition, &conditions.index(i)));
    }
    errs
}

pub fn validate_session_binding_constraint(constraint: &SessionBindingConstraint) -> ErrorList {
    let mut errs = validate_metadata(&constraint.metadata, &FieldPath::new("metadata"));
    let spec = FieldPath::new("spec");
    let s = &constraint.spec;

    match s.constraint_type {
        None => errs.push(FieldError::required(
            spec.child("constraintType"),
            "constraintType must be specified",
        )),
        Some(ConstraintType::MaxBindings) if s.max_bindings.unwrap_or(0) == 0 => {
            errs.push(FieldError::required(
                spec.child("maxBindings"),
                "must be set when constraintType is MaxBindings",
            ));
        }
        Some(ConstraintType::MaxBindingsPerSession)
            if s.max_bindings_per_session.unwrap_or(0) == 0 =>
        {
            errs.push(FieldError::required(
                spec.child("maxBindingsPerSession"),
                "must be set when constraintType is MaxBindingsPerSession",
            ));
        }
        Some(_) => {}
    }

    match &s.target {
        None => errs.push(FieldError::required(spec.child("target"), "target must be specified")),
        Some(target) => errs.extend(validate_constraint_target(target, &spec.child("target"))),
    }

    errs.extend(validate_non_negative(s.max_bindings, &spec.child("maxBindings")));
    errs.extend(validate_non_negative(
        s.max_bindings_per_session,
        &spec.child("maxBindingsPerSession"),
    ));
    errs.extend(validate_optional_range(
        s.max_violations,
        MAX_VIOLATIONS_MIN,
        MAX_VIOLATIONS_MAX,
        &spec.child("maxViolations"),
    ));

    let exemptions = spec.child("exemptions");
    for (i, exemption) in s.exemptions.iter().enumerate() {
        errs.extend(validate_exemption(exemption, &exemptions.index(i)));
    }
    errs.extend(validate_unique_names(
        s.exemptions.iter().map(|e| e.name.as_str()),
        &exemptions,
        "name",
    ));
    errs
}
