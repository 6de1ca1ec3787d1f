//! Traffic split controller.
//!
//! A new split is first staged as the target, then promoted to active.
//! The weight-sum invariant is checked on promotion, so a split that
//! slipped past admission still never starts serving.

use tracing::{info, warn};

use fleetgrid_types::{TRAFFIC_WEIGHT_TOTAL, TrafficSplitting, TrafficStatus};

use crate::{TransitionError, TransitionResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficController {
    pub workload: String,
    status: TrafficStatus,
}

impl TrafficController {
    pub fn new(workload: &str) -> Self {
        Self {
            workload: workload.to_string(),
            status: TrafficStatus::default(),
        }
    }

    pub fn from_status(workload: &str, status: TrafficStatus) -> Self {
        Self {
            workload: workload.to_string(),
            status,
        }
    }

    pub fn status(&self) -> &TrafficStatus {
        &self.status
    }

    pub fn target(&self) -> &TrafficSplitting {
        &self.status.target
    }

    pub fn active(&self) -> &TrafficSplitting {
        &self.status.active
    }

    /// Stage `split` as the next target. Nothing is checked until promotion.
    pub fn set_target(&mut self, split: TrafficSplitting) {
        self.status.target = split;
    }

    /// Promote the staged target to active.
    ///
    /// An empty target clears the active split. A non-empty target must
    /// keep every weight in `[0, 100]` and sum to exactly 100; otherwise the
    /// active split is left untouched.
    pub fn promote(&mut self, now: u64) -> TransitionResult<()> {
        let target = &self.status.target;
        if !target.is_unset() {
            if let Some(entry) = target.clusters.iter().find(|c| !(0..=100).contains(&c.weight)) {
                warn!(
                    workload = %self.workload,
                    cluster = %entry.cluster_name,
                    weight = entry.weight,
                    "traffic promotion rejected"
                );
                return Err(TransitionError::WeightRange {
                    cluster: entry.cluster_name.clone(),
                    weight: entry.weight,
                });
            }
            let sum = target.total_weight();
            if sum != TRAFFIC_WEIGHT_TOTAL {
                warn!(workload = %self.workload, sum, "traffic promotion rejected");
                return Err(TransitionError::WeightSum { sum });
            }
        }
        self.status.active = target.clone();
        self.status.last_promoted_at = Some(now);
        info!(
            workload = %self.workload,
            clusters = self.status.active.clusters.len(),
            "traffic split promoted"
        );
        Ok(())
    }

    /// Cluster serving the request hashed to `point` in `[0, 100)`.
    pub fn route(&self, point: u32) -> Option<&str> {
        self.status.active.pick(point)
    }

    pub fn into_status(self) -> TrafficStatus {
        self.status
    }
}

/// A two-way split sending `canary_weight` percent to `canary`.
///
/// # Panics
///
/// Panics if `canary_weight` lies outside `[0, 100]`.
pub fn canary_split(stable: &str, canary: &str, canary_weight: i32) -> TrafficSplitting {
    assert!(
        (0..=100).contains(&canary_weight),
        "canary weight {canary_weight} outside [0, 100]"
    );
    TrafficSplitting::from_weights([(stable, 100 - canary_weight), (canary, canary_weight)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Rollout;
    use fleetgrid_types::{CanaryStep, RolloutStrategy};

    #[test]
    fn promotes_split_summing_to_100() {
        let mut traffic = TrafficController::new("shop/web");
        traffic.set_target(TrafficSplitting::from_weights([("c1", 50), ("c2", 30), ("c3", 20)]));
        traffic.promote(10).unwrap();
        assert_eq!(traffic.active().weight_of("c2"), Some(30));
        assert_eq!(traffic.status().last_promoted_at, Some(10));
    }

    #[test]
    fn rejects_split_summing_to_90() {
        let mut traffic = TrafficController::new("shop/web");
        traffic.set_target(TrafficSplitting::from_weights([("c1", 100)]));
        traffic.promote(1).unwrap();

        traffic.set_target(TrafficSplitting::from_weights([("c1", 50), ("c2", 30), ("c3", 10)]));
        assert_eq!(traffic.promote(2), Err(TransitionError::WeightSum { sum: 90 }));
        assert_eq!(traffic.active().weight_of("c1"), Some(100));
        assert_eq!(traffic.status().last_promoted_at, Some(1));
    }

    #[test]
    fn rejects_out_of_range_weights_that_sum_to_100() {
        let mut traffic = TrafficController::new("shop/web");
        traffic.set_target(TrafficSplitting::from_weights([("a", 150), ("b", -50)]));
        assert_eq!(
            traffic.promote(1),
            Err(TransitionError::WeightRange {
                cluster: "a".to_string(),
                weight: 150
            })
        );
        assert!(traffic.active().is_unset());
        assert_eq!(traffic.route(99), None);

        traffic.set_target(TrafficSplitting::from_weights([("a", 0), ("b", 110), ("c", -10)]));
        assert!(matches!(
            traffic.promote(2),
            Err(TransitionError::WeightRange { weight: 110, .. })
        ));
        assert_eq!(traffic.status().last_promoted_at, None);
    }

    #[test]
    fn empty_target_clears_active() {
        let mut traffic = TrafficController::new("shop/web");
        traffic.set_target(TrafficSplitting::from_weights([("c1", 100)]));
        traffic.promote(1).unwrap();
        traffic.set_target(TrafficSplitting::default());
        traffic.promote(2).unwrap();
        assert!(traffic.active().is_unset());
        assert_eq!(traffic.route(0), None);
    }

    #[test]
    fn routing_uses_active_split_only() {
        let mut traffic = TrafficController::new("shop/web");
        traffic.set_target(TrafficSplitting::from_weights([("c1", 70), ("c2", 30)]));
        assert_eq!(traffic.route(0), None);
        traffic.promote(1).unwrap();
        assert_eq!(traffic.route(69), Some("c1"));
        assert_eq!(traffic.route(70), Some("c2"));
    }

    #[test]
    fn canary_steps_drive_traffic() {
        let strategy = RolloutStrategy::Canary {
            steps: vec![
                CanaryStep { weight: 20, pause: None },
                CanaryStep { weight: 100, pause: None },
            ],
        };
        let mut rollout = Rollout::new("shop/web", strategy, 4);
        let mut traffic = TrafficController::new("shop/web");
        rollout.start(0).unwrap();
        rollout.advance_step(1).unwrap();

        let weight = rollout.current_canary_weight().unwrap();
        traffic.set_target(canary_split("stable", "canary", weight));
        traffic.promote(1).unwrap();
        assert_eq!(traffic.active().weight_of("canary"), Some(20));
        assert_eq!(traffic.active().weight_of("stable"), Some(80));
    }

    #[test]
    #[should_panic(expected = "canary weight 120")]
    fn canary_weight_out_of_range_panics() {
        canary_split("a", "b", 120);
    }
}
