//! Workload health policies and health-check results.
//!
//! Probes themselves run outside this crate; only their configuration
//! and their completed results are modelled here.

use serde::{Deserialize, Serialize};

use crate::meta::Object;
use crate::selector::{ClusterSelector, WorkloadSelector};

/// Bounds for a health score.
pub const HEALTH_SCORE_MIN: i32 = 0;
pub const HEALTH_SCORE_MAX: i32 = 100;

/// Probe configuration. The tag selects the payload, so a probe can never
/// be missing the settings its type needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum HealthProbe {
    Http {
        path: String,
        port: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_status: Option<i32>,
    },
    Tcp {
        port: i32,
    },
    Grpc {
        port: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service: Option<String>,
    },
    Command {
        command: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub name: String,
    pub probe: HealthProbe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Consecutive failures before the check reports Unhealthy; `0` = default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<i32>,
    /// Consecutive successes before the check reports Healthy; `0` = default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<i32>,
}

/// What the controller should do when a workload turns unhealthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnhealthyAction {
    #[default]
    Alert,
    Failover,
    Restart,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadHealthPolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_selector: Option<WorkloadSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_selector: Option<ClusterSelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_checks: Vec<HealthCheck>,
    /// Overall score below which `unhealthy_action` fires; `0` disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_score_threshold: Option<i32>,
    #[serde(default)]
    pub unhealthy_action: UnhealthyAction,
}

/// Health verdict of a check or of a whole workload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
    Degraded,
}

/// Completed result of one health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    pub status: HealthStatus,
    /// Score in `[0, 100]`.
    pub score: i32,
    #[serde(default)]
    pub consecutive_successes: u32,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_time: Option<u64>,
}

impl HealthCheckResult {
    pub fn new(name: &str, status: HealthStatus, score: i32) -> Self {
        Self {
            name: name.to_string(),
            cluster_name: None,
            status,
            score,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_check_time: None,
        }
    }
}

/// Integer average of the scores, truncated toward zero. Empty yields `0`.
///
/// `[90, 80]` gives `85`; `[90, 81]` gives `85` as well.
pub fn overall_health_score(results: &[HealthCheckResult]) -> i32 {
    if results.is_empty() {
        return 0;
    }
    let sum: i64 = results.iter().map(|r| i64::from(r.score)).sum();
    let avg = sum / results.len() as i64;
    avg as i32
}

/// Observed health for a policy.
///
/// `overall_health_score` is derived from `results` and cannot be set on
/// its own; it is recomputed on every replacement and on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawHealthPolicyStatus")]
pub struct WorkloadHealthPolicyStatus {
    #[serde(default)]
    observed_generation: u64,
    #[serde(default)]
    results: Vec<HealthCheckResult>,
    #[serde(default)]
    overall_health_score: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHealthPolicyStatus {
    #[serde(default)]
    observed_generation: u64,
    #[serde(default)]
    results: Vec<HealthCheckResult>,
}

impl From<RawHealthPolicyStatus> for WorkloadHealthPolicyStatus {
    fn from(raw: RawHealthPolicyStatus) -> Self {
        let mut status = Self {
            observed_generation: raw.observed_generation,
            ..Default::default()
        };
        status.replace_results(raw.results);
        status
    }
}

impl WorkloadHealthPolicyStatus {
    pub fn observed_generation(&self) -> u64 {
        self.observed_generation
    }

    pub fn set_observed_generation(&mut self, generation: u64) {
        self.observed_generation = generation;
    }

    pub fn results(&self) -> &[HealthCheckResult] {
        &self.results
    }

    pub fn overall_health_score(&self) -> i32 {
        self.overall_health_score
    }

    /// Replace the result set and recompute the overall score.
    pub fn replace_results(&mut self, results: Vec<HealthCheckResult>) {
        self.overall_health_score = overall_health_score(&results);
        self.results = results;
    }
}

pub type WorkloadHealthPolicy = Object<WorkloadHealthPolicySpec, WorkloadHealthPolicyStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[i32]) -> Vec<HealthCheckResult> {
        values
            .iter()
            .enumerate()
            .map(|(i, s)| HealthCheckResult::new(&format!("check-{i}"), HealthStatus::Healthy, *s))
            .collect()
    }

    #[test]
    fn even_split_averages_exactly() {
        assert_eq!(overall_health_score(&scores(&[90, 80])), 85);
    }

    #[test]
    fn odd_split_truncates() {
        assert_eq!(overall_health_score(&scores(&[90, 81])), 85);
        assert_eq!(overall_health_score(&scores(&[100, 99, 99])), 99);
    }

    #[test]
    fn empty_result_set_scores_zero() {
        assert_eq!(overall_health_score(&[]), 0);
    }

    #[test]
    fn replacing_results_recomputes_score() {
        let mut status = WorkloadHealthPolicyStatus::default();
        status.replace_results(scores(&[90, 80]));
        assert_eq!(status.overall_health_score(), 85);

        status.replace_results(scores(&[40]));
        assert_eq!(status.overall_health_score(), 40);
    }

    #[test]
    fn deserialization_ignores_stale_score() {
        let json = r#"{
            "observedGeneration": 3,
            "results": [
                {"name": "http", "status": "Healthy", "score": 90},
                {"name": "tcp", "status": "Degraded", "score": 80}
            ],
            "overallHealthScore": 12
        }"#;
        let status: WorkloadHealthPolicyStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.overall_health_score(), 85);
        assert_eq!(status.observed_generation(), 3);
    }

    #[test]
    fn probe_tag_is_co_located_with_payload() {
        let check = HealthCheck {
            name: "grpc".to_string(),
            probe: HealthProbe::Grpc {
                port: 9090,
                service: None,
            },
            interval: None,
            timeout: None,
            failure_threshold: None,
            success_threshold: None,
        };
        let json = serde_json::to_string(&check).unwrap();
        assert_eq!(json, r#"{"name":"grpc","probe":{"type":"Grpc","port":9090}}"#);
    }
}
