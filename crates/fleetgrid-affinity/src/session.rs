//! Admission of sticky bindings against session-binding constraints.
//!
//! A candidate binding is checked against every constraint whose target
//! covers it, and against the session's stickiness policy. A violation is
//! then either exempted, tolerated (the constraint still has violation
//! budget), downgraded to a warning (`Warn` enforcement), or denied.
//!
//! Only bindings that are `Active` and not yet expired at `ctx.now` count
//! towards any limit.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use fleetgrid_types::{
    BindingPhase, ClusterInfo, ConstraintExemption, ConstraintTarget, ConstraintType,
    EnforcementAction, ExemptionCondition, SessionBindingConstraint, StickinessPolicy,
    StickyBinding, TargetType,
};

use crate::binding::is_expired;
use crate::matcher::label_selector_matches;

/// Binding label naming the workload a session belongs to.
pub const WORKLOAD_LABEL: &str = "fleetgrid.io/workload";

/// Observations the caller supplies for one admission.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    /// Unix seconds; all expiry and time-window checks use this.
    pub now: u64,
    /// Health score per cluster, `[0, 100]`.
    pub cluster_health: BTreeMap<String, i32>,
    /// Load percent per cluster.
    pub cluster_load: BTreeMap<String, i32>,
    /// Clusters under maintenance.
    pub maintenance: BTreeSet<String>,
    /// Known clusters, for label-selector targets.
    pub clusters: BTreeMap<String, ClusterInfo>,
}

impl EvaluationContext {
    pub fn at(now: u64) -> Self {
        Self {
            now,
            ..Default::default()
        }
    }
}

/// What became of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Within the constraint's `maxViolations` budget.
    Tolerated,
    /// Enforcement is `Warn`.
    Warned,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Name of the violated constraint, or `stickiness` for the session policy.
    pub constraint: String,
    pub constraint_type: Option<ConstraintType>,
    pub message: String,
    pub disposition: Disposition,
}

/// Outcome of [`admit_binding`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingVerdict {
    pub violations: Vec<ConstraintViolation>,
    /// `constraint/exemption` pairs that excused a violation.
    pub exemptions_applied: Vec<String>,
}

impl BindingVerdict {
    pub fn is_admitted(&self) -> bool {
        !self
            .violations
            .iter()
            .any(|v| v.disposition == Disposition::Denied)
    }

    /// Violations that did not block admission.
    pub fn warnings(&self) -> impl Iterator<Item = &ConstraintViolation> {
        self.violations
            .iter()
            .filter(|v| v.disposition != Disposition::Denied)
    }
}

fn is_live(binding: &StickyBinding, now: u64) -> bool {
    binding.status.phase == BindingPhase::Active && !is_expired(binding, now)
}

fn target_covers(target: &ConstraintTarget, binding: &StickyBinding, ctx: &EvaluationContext) -> bool {
    let (name, labels) = match target.target_type {
        TargetType::Cluster => (
            Some(binding.spec.target_cluster.as_str()),
            ctx.clusters
                .get(&binding.spec.target_cluster)
                .map(|c| &c.labels),
        ),
        TargetType::Session => (
            Some(binding.spec.session_identifier.as_str()),
            Some(&binding.metadata.labels),
        ),
        TargetType::Workload => (
            binding.metadata.labels.get(WORKLOAD_LABEL).map(String::as_str),
            Some(&binding.metadata.labels),
        ),
    };
    let by_name = name.is_some_and(|n| target.names.iter().any(|t| t == n));
    let by_selector = target
        .selector
        .as_ref()
        .filter(|s| !s.is_empty())
        .zip(labels)
        .is_some_and(|(s, l)| label_selector_matches(s, l));
    by_name || by_selector
}

/// Key a binding is counted under for a `MaxBindings` target.
fn grouping_key(target_type: TargetType, binding: &StickyBinding) -> Option<&str> {
    match target_type {
        TargetType::Cluster => Some(binding.spec.target_cluster.as_str()),
        TargetType::Session => Some(binding.spec.session_identifier.as_str()),
        TargetType::Workload => binding.metadata.labels.get(WORKLOAD_LABEL).map(String::as_str),
    }
}

fn condition_holds(condition: &ExemptionCondition, cluster: &str, ctx: &EvaluationContext) -> bool {
    match condition {
        ExemptionCondition::HealthBelow { score } => {
            ctx.cluster_health.get(cluster).is_some_and(|h| h < score)
        }
        ExemptionCondition::LoadAbove { percent } => {
            ctx.cluster_load.get(cluster).is_some_and(|l| l > percent)
        }
        ExemptionCondition::Maintenance => ctx.maintenance.contains(cluster),
        ExemptionCondition::TimeWindow { start, end } => (*start..*end).contains(&ctx.now),
    }
}

fn exemption_applies(
    exemption: &ConstraintExemption,
    constraint_target: &ConstraintTarget,
    binding: &StickyBinding,
    ctx: &EvaluationContext,
) -> bool {
    if exemption.expires_at.is_some_and(|at| ctx.now >= at) {
        return false;
    }
    let target = exemption.target.as_ref().unwrap_or(constraint_target);
    target_covers(target, binding, ctx)
        && exemption
            .conditions
            .iter()
            .all(|c| condition_holds(c, &binding.spec.target_cluster, ctx))
}

/// Check one constraint. Returns a message when the candidate would violate it.
fn check_constraint(
    constraint: &SessionBindingConstraint,
    target: &ConstraintTarget,
    candidate: &StickyBinding,
    live: &[&StickyBinding],
) -> Option<String> {
    let spec = &constraint.spec;
    let in_target = live
        .iter()
        .filter(|b| b.metadata.name != candidate.metadata.name);
    match spec.constraint_type? {
        ConstraintType::MaxBindings => {
            let max = spec.max_bindings.filter(|&n| n > 0)?;
            let key = grouping_key(target.target_type, candidate)?;
            let count = in_target
                .filter(|b| grouping_key(target.target_type, b) == Some(key))
                .count();
            (count + 1 > max as usize)
                .then(|| format!("{key} would hold {} active bindings (max {max})", count + 1))
        }
        ConstraintType::MaxBindingsPerSession => {
            let max = spec.max_bindings_per_session.filter(|&n| n > 0)?;
            let session = &candidate.spec.session_identifier;
            let count = in_target
                .filter(|b| &b.spec.session_identifier == session)
                .count();
            (count + 1 > max as usize).then(|| {
                format!("session {session} would hold {} active bindings (max {max})", count + 1)
            })
        }
        ConstraintType::ExclusiveBinding => {
            let session = &candidate.spec.session_identifier;
            in_target
                .filter(|b| &b.spec.session_identifier == session)
                .find(|b| b.spec.target_cluster != candidate.spec.target_cluster)
                .map(|b| {
                    format!(
                        "session {session} is already bound to {}",
                        b.spec.target_cluster
                    )
                })
        }
    }
}

/// Decide whether `candidate` may be admitted next to `existing` bindings.
///
/// Constraints without a type or target never match. The returned verdict
/// lists every violation; [`BindingVerdict::is_admitted`] is false iff at
/// least one of them is denied.
pub fn admit_binding(
    candidate: &StickyBinding,
    existing: &[StickyBinding],
    constraints: &[SessionBindingConstraint],
    stickiness: Option<&StickinessPolicy>,
    ctx: &EvaluationContext,
) -> BindingVerdict {
    let mut verdict = BindingVerdict::default();
    let session = &candidate.spec.session_identifier;

    for constraint in constraints {
        let Some(target) = &constraint.spec.target else {
            continue;
        };
        if !target_covers(target, candidate, ctx) {
            continue;
        }
        let live: Vec<&StickyBinding> = existing
            .iter()
            .filter(|b| is_live(b, ctx.now) && target_covers(target, b, ctx))
            .collect();
        let Some(message) = check_constraint(constraint, target, candidate, &live) else {
            continue;
        };

        let name = &constraint.metadata.name;
        if let Some(exemption) = constraint
            .spec
            .exemptions
            .iter()
            .find(|e| exemption_applies(e, target, candidate, ctx))
        {
            debug!(constraint = %name, exemption = %exemption.name, session = %session, "violation exempted");
            verdict
                .exemptions_applied
                .push(format!("{name}/{}", exemption.name));
            continue;
        }

        let budget = constraint
            .spec
            .max_violations
            .filter(|&n| n > 0)
            .map_or(0, |n| n as u32);
        let disposition = if constraint.status.violation_count < budget {
            Disposition::Tolerated
        } else if constraint.spec.enforcement == EnforcementAction::Warn {
            Disposition::Warned
        } else {
            Disposition::Denied
        };
        warn!(
            constraint = %name,
            session = %session,
            cluster = %candidate.spec.target_cluster,
            ?disposition,
            "{message}"
        );
        verdict.violations.push(ConstraintViolation {
            constraint: name.clone(),
            constraint_type: constraint.spec.constraint_type,
            message,
            disposition,
        });
    }

    if let Some(max) = stickiness.and_then(|s| s.max_bindings).filter(|&n| n > 0) {
        let count = existing
            .iter()
            .filter(|b| b.metadata.name != candidate.metadata.name)
            .filter(|b| &b.spec.session_identifier == session && is_live(b, ctx.now))
            .count();
        if count + 1 > max as usize {
            warn!(session = %session, max, "session binding limit exceeded");
            verdict.violations.push(ConstraintViolation {
                constraint: "stickiness".to_string(),
                constraint_type: None,
                message: format!("session {session} would hold {} bindings (max {max})", count + 1),
                disposition: Disposition::Denied,
            });
        }
    }

    verdict
}

/// Charge each violation in `verdict` to its constraint's status.
pub fn record_violations(
    verdict: &BindingVerdict,
    constraints: &mut [SessionBindingConstraint],
    now: u64,
) {
    for violation in &verdict.violations {
        if let Some(constraint) = constraints
            .iter_mut()
            .find(|c| c.metadata.name == violation.constraint)
        {
            constraint.status.violation_count = constraint.status.violation_count.saturating_add(1);
            constraint.status.last_violation_at = Some(now);
        }
    }
}
