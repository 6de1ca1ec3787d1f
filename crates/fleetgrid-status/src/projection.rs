//! Status views derived from ledger records and binding sets.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use fleetgrid_affinity::is_expired;
use fleetgrid_ledger::LedgerSnapshot;
use fleetgrid_types::{
    BindingPhase, ConnectionMetrics, HealthCheckResult, RolloutState, SessionAffinityPolicyStatus,
    StickyBinding, TrafficStatus, WorkloadPlacementAdvancedStatus, overall_health_score,
};

/// Placement status for one workload at `generation`.
pub fn project_placement_status(
    snapshot: &LedgerSnapshot,
    rollout: Option<&RolloutState>,
    traffic: Option<&TrafficStatus>,
    generation: u64,
) -> WorkloadPlacementAdvancedStatus {
    debug!(
        workload = %snapshot.workload.key(),
        decisions = snapshot.decisions.len(),
        open_conflicts = snapshot.open_conflicts().count(),
        "placement status projected"
    );
    WorkloadPlacementAdvancedStatus {
        observed_generation: generation,
        decisions: snapshot.decisions.clone(),
        conflicts: snapshot.conflicts.clone(),
        statistics: snapshot.statistics.clone(),
        rollout: rollout.cloned(),
        traffic: traffic.cloned(),
    }
}

/// Session-affinity status over `bindings` as of `now`.
///
/// A binding whose expiry has passed counts as expired even if its phase
/// was not updated yet. `health_score` is only set when results exist.
pub fn project_session_status(
    bindings: &[StickyBinding],
    now: u64,
    health: &[HealthCheckResult],
    generation: u64,
) -> SessionAffinityPolicyStatus {
    let mut cluster_bindings: BTreeMap<String, u64> = BTreeMap::new();
    let mut sessions = BTreeSet::new();
    let mut active_sessions = BTreeSet::new();
    let mut metrics = ConnectionMetrics::default();

    for binding in bindings {
        let session = binding.spec.session_identifier.as_str();
        sessions.insert(session);
        match binding.status.phase {
            BindingPhase::Superseded => metrics.superseded_bindings += 1,
            _ if is_expired(binding, now) => metrics.expired_bindings += 1,
            _ => {
                *cluster_bindings
                    .entry(binding.spec.target_cluster.clone())
                    .or_default() += 1;
                active_sessions.insert(session);
            }
        }
    }

    metrics.total_sessions = sessions.len() as u64;
    metrics.active_sessions = active_sessions.len() as u64;

    SessionAffinityPolicyStatus {
        observed_generation: generation,
        active_bindings: cluster_bindings.values().sum(),
        cluster_bindings,
        connection_metrics: metrics,
        health_score: (!health.is_empty()).then(|| overall_health_score(health)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrid_ledger::{ConflictRules, DecisionLedger};
    use fleetgrid_types::{
        DecisionStatus, HealthStatus, ObjectMeta, PlacementDecision, RolloutPhase, StickyBindingSpec,
        TrafficSplitting, WorkloadReference,
    };

    fn binding(name: &str, session: &str, cluster: &str, expires_at: Option<u64>) -> StickyBinding {
        StickyBinding::new(
            ObjectMeta::named(name),
            StickyBindingSpec {
                session_identifier: session.to_string(),
                target_cluster: cluster.to_string(),
                created_at: 0,
                expires_at,
                ..Default::default()
            },
        )
    }

    #[test]
    fn session_status_counts_by_phase() {
        let mut superseded = binding("b4", "s2", "c2", None);
        superseded.status.phase = BindingPhase::Superseded;
        let bindings = vec![
            binding("b1", "s1", "c1", None),
            binding("b2", "s2", "c1", Some(500)),
            binding("b3", "s3", "c2", Some(50)),
            superseded,
        ];

        let status = project_session_status(&bindings, 100, &[], 4);
        assert_eq!(status.observed_generation, 4);
        assert_eq!(status.active_bindings, 2);
        assert_eq!(status.cluster_bindings.get("c1"), Some(&2));
        assert_eq!(status.cluster_bindings.get("c2"), None);
        assert_eq!(status.connection_metrics.total_sessions, 3);
        assert_eq!(status.connection_metrics.active_sessions, 2);
        assert_eq!(status.connection_metrics.expired_bindings, 1);
        assert_eq!(status.connection_metrics.superseded_bindings, 1);
        assert_eq!(status.health_score, None);
    }

    #[test]
    fn session_status_reports_health_score() {
        let health = [
            HealthCheckResult::new("http", HealthStatus::Healthy, 90),
            HealthCheckResult::new("tcp", HealthStatus::Healthy, 81),
        ];
        let status = project_session_status(&[], 0, &health, 1);
        assert_eq!(status.health_score, Some(85));
        assert_eq!(status.active_bindings, 0);
    }

    #[test]
    fn placement_status_mirrors_ledger() {
        let workload = WorkloadReference::new("apps/v1", "Deployment", "web", Some("shop"));
        let ledger = DecisionLedger::new();
        let rules = ConflictRules {
            exclusive: true,
            ..Default::default()
        };
        for (cluster, at) in [("c1", 10), ("c2", 20)] {
            ledger.record_decision(
                PlacementDecision {
                    workload: workload.clone(),
                    cluster_name: cluster.to_string(),
                    score: 5,
                    reason: "ranked".to_string(),
                    decision_time: at,
                    status: DecisionStatus::Executed,
                },
                &rules,
            );
        }
        let snapshot = ledger.snapshot(&workload).unwrap();
        let rollout = RolloutState {
            phase: RolloutPhase::InProgress,
            current_step: 1,
            total_steps: 3,
            message: None,
            last_transition_time: Some(20),
        };
        let traffic = TrafficStatus {
            active: TrafficSplitting::from_weights([("c1", 100)]),
            ..Default::default()
        };

        let status = project_placement_status(&snapshot, Some(&rollout), Some(&traffic), 7);
        assert_eq!(status.observed_generation, 7);
        assert_eq!(status.decisions.len(), 2);
        assert_eq!(status.conflicts.len(), 1);
        assert_eq!(status.statistics.total, 2);
        assert_eq!(status.statistics.successful, 2);
        assert_eq!(status.statistics.last_updated, Some(20));
        assert_eq!(status.rollout, Some(rollout));
        assert_eq!(status.traffic.unwrap().active.weight_of("c1"), Some(100));
    }
}
