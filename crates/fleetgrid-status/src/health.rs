//! Aggregation of check results into a workload health status.

use tracing::{debug, warn};

use fleetgrid_types::{
    HealthCheckResult, HealthStatus, UnhealthyAction, WorkloadHealthPolicy, WorkloadHealthPolicyStatus,
};

/// Combined verdict over a set of check results.
///
/// Unknown when empty, Healthy when every check is Healthy, Unhealthy when
/// every check is Unhealthy, otherwise Degraded.
pub fn aggregate_status(results: &[HealthCheckResult]) -> HealthStatus {
    if results.is_empty() {
        return HealthStatus::Unknown;
    }
    if results.iter().all(|r| r.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else if results.iter().all(|r| r.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    }
}

/// Build the status block for `policy` from the latest results.
pub fn project_health_status(
    policy: &WorkloadHealthPolicy,
    results: Vec<HealthCheckResult>,
) -> WorkloadHealthPolicyStatus {
    let mut status = WorkloadHealthPolicyStatus::default();
    status.set_observed_generation(policy.metadata.generation);
    status.replace_results(results);
    debug!(
        policy = %policy.metadata.key(),
        score = status.overall_health_score(),
        "health status projected"
    );
    status
}

/// Action to take when the overall score drops below the policy threshold.
///
/// An unset or zero threshold never fires.
pub fn unhealthy_action(policy: &WorkloadHealthPolicy, status: &WorkloadHealthPolicyStatus) -> Option<UnhealthyAction> {
    let threshold = policy.spec.health_score_threshold.filter(|t| *t > 0)?;
    let score = status.overall_health_score();
    if score >= threshold {
        return None;
    }
    let action = policy.spec.unhealthy_action;
    warn!(
        policy = %policy.metadata.key(),
        score,
        threshold,
        ?action,
        "health score below threshold"
    );
    Some(action)
}
