//! Health check state from externally executed probes.
//!
//! A tracker never runs a probe itself. The caller feeds it completed
//! probe outcomes and reads back a [`HealthCheckResult`].

use std::collections::VecDeque;

use serde::Deserialize;
use tracing::{debug, warn};

use fleetgrid_types::{HEALTH_SCORE_MAX, HealthCheck, HealthCheckResult, HealthStatus};

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_SUCCESS_THRESHOLD: u32 = 1;
const DEFAULT_WINDOW: usize = 10;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProbeResult {
    /// The probe passed.
    Healthy,
    /// The probe ran and reported failure.
    Unhealthy,
    /// The probe could not be executed.
    Failed,
}

impl ProbeResult {
    fn passed(self) -> bool {
        self == Self::Healthy
    }
}

/// Tracks consecutive probe results for one health check.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    /// Current health status.
    status: HealthStatus,
    consecutive_failures: u32,
    consecutive_successes: u32,
    /// Failures in a row before the check turns Unhealthy.
    failure_threshold: u32,
    /// Successes in a row before the check turns Healthy.
    success_threshold: u32,
    /// Most recent outcomes, oldest first.
    window: VecDeque<bool>,
    window_size: usize,
    last_check_time: Option<u64>,
}

impl HealthTracker {
    /// Create a tracker from a check's configured thresholds.
    ///
    /// Unset or zero thresholds fall back to 3 failures and 1 success.
    pub fn new(check: &HealthCheck) -> Self {
        Self::with_defaults(
            check,
            DEFAULT_FAILURE_THRESHOLD,
            DEFAULT_SUCCESS_THRESHOLD,
            DEFAULT_WINDOW,
        )
    }

    /// Like [`HealthTracker::new`], with operator-supplied fallbacks.
    pub fn with_defaults(check: &HealthCheck, failure_threshold: u32, success_threshold: u32, window_size: usize) -> Self {
        Self::with_thresholds(
            threshold(check.failure_threshold, failure_threshold),
            threshold(check.success_threshold, success_threshold),
            window_size,
        )
    }

    /// Create a tracker with explicit thresholds and window size.
    pub fn with_thresholds(failure_threshold: u32, success_threshold: u32, window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            status: HealthStatus::Unknown,
            consecutive_failures: 0,
            consecutive_successes: 0,
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            window: VecDeque::with_capacity(window_size),
            window_size,
            last_check_time: None,
        }
    }

    /// Record a probe outcome observed at `now` and return the new status.
    ///
    /// A healthy check that starts failing reports Degraded until the
    /// failure threshold is reached.
    pub fn record(&mut self, result: ProbeResult, now: u64) -> HealthStatus {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(result.passed());
        self.last_check_time = Some(now);

        if result.passed() {
            self.consecutive_failures = 0;
            self.consecutive_successes += 1;
            if self.consecutive_successes >= self.success_threshold {
                if self.status != HealthStatus::Healthy {
                    debug!(successes = self.consecutive_successes, "check recovered to healthy");
                }
                self.status = HealthStatus::Healthy;
            }
        } else {
            self.consecutive_successes = 0;
            self.consecutive_failures += 1;
            if self.consecutive_failures >= self.failure_threshold {
                if self.status != HealthStatus::Unhealthy {
                    warn!(
                        failures = self.consecutive_failures,
                        threshold = self.failure_threshold,
                        "check marked unhealthy"
                    );
                }
                self.status = HealthStatus::Unhealthy;
            } else if self.status == HealthStatus::Healthy {
                self.status = HealthStatus::Degraded;
            }
        }
        self.status
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// Share of passing probes in the window, in `[0, 100]`. No probes yet scores 0.
    pub fn score(&self) -> i32 {
        if self.window.is_empty() {
            return 0;
        }
        let passed = self.window.iter().filter(|ok| **ok).count();
        (passed * HEALTH_SCORE_MAX as usize / self.window.len()) as i32
    }

    /// Snapshot of the check as a reportable result.
    pub fn result(&self, name: &str, cluster_name: Option<&str>) -> HealthCheckResult {
        HealthCheckResult {
            name: name.to_string(),
            cluster_name: cluster_name.map(str::to_string),
            status: self.status,
            score: self.score(),
            consecutive_successes: self.consecutive_successes,
            consecutive_failures: self.consecutive_failures,
            last_check_time: self.last_check_time,
        }
    }
}

fn threshold(value: Option<i32>, default: u32) -> u32 {
    match value {
        Some(v) if v > 0 => v as u32,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrid_types::HealthProbe;

    #[test]
    fn starts_unknown() {
        let tracker = HealthTracker::with_thresholds(3, 1, 5);
        assert_eq!(tracker.status(), HealthStatus::Unknown);
        assert_eq!(tracker.score(), 0);
    }

    #[test]
    fn unhealthy_after_threshold() {
        let mut tracker = HealthTracker::with_thresholds(3, 1, 5);
        assert_eq!(tracker.record(ProbeResult::Unhealthy, 1), HealthStatus::Unknown);
        assert_eq!(tracker.record(ProbeResult::Failed, 2), HealthStatus::Unknown);
        assert_eq!(tracker.record(ProbeResult::Unhealthy, 3), HealthStatus::Unhealthy);
        assert_eq!(tracker.consecutive_failures(), 3);
    }

    #[test]
    fn healthy_check_degrades_before_failing() {
        let mut tracker = HealthTracker::with_thresholds(2, 1, 5);
        assert_eq!(tracker.record(ProbeResult::Healthy, 1), HealthStatus::Healthy);
        assert_eq!(tracker.record(ProbeResult::Unhealthy, 2), HealthStatus::Degraded);
        assert_eq!(tracker.record(ProbeResult::Unhealthy, 3), HealthStatus::Unhealthy);
    }

    #[test]
    fn recovery_needs_success_threshold() {
        let mut tracker = HealthTracker::with_thresholds(1, 2, 5);
        tracker.record(ProbeResult::Failed, 1);
        assert_eq!(tracker.record(ProbeResult::Healthy, 2), HealthStatus::Unhealthy);
        assert_eq!(tracker.record(ProbeResult::Healthy, 3), HealthStatus::Healthy);
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn score_slides_over_window() {
        let mut tracker = HealthTracker::with_thresholds(3, 1, 4);
        for (i, r) in [ProbeResult::Unhealthy, ProbeResult::Healthy, ProbeResult::Healthy, ProbeResult::Healthy]
            .into_iter()
            .enumerate()
        {
            tracker.record(r, i as u64);
        }
        assert_eq!(tracker.score(), 75);
        // Oldest failure falls out of the window.
        tracker.record(ProbeResult::Healthy, 4);
        assert_eq!(tracker.score(), 100);
    }

    #[test]
    fn thresholds_default_when_unset_or_zero() {
        let check = HealthCheck {
            name: "http".to_string(),
            probe: HealthProbe::Tcp { port: 80 },
            interval: None,
            timeout: None,
            failure_threshold: Some(0),
            success_threshold: None,
        };
        let mut tracker = HealthTracker::new(&check);
        tracker.record(ProbeResult::Failed, 1);
        tracker.record(ProbeResult::Failed, 2);
        assert_eq!(tracker.status(), HealthStatus::Unknown);
        assert_eq!(tracker.record(ProbeResult::Failed, 3), HealthStatus::Unhealthy);
    }

    #[test]
    fn probe_results_parse_from_names() {
        let parsed: Vec<ProbeResult> = serde_json::from_str(r#"["Healthy", "Unhealthy", "Failed"]"#).unwrap();
        assert_eq!(parsed, vec![ProbeResult::Healthy, ProbeResult::Unhealthy, ProbeResult::Failed]);
    }

    #[test]
    fn check_thresholds_win_over_fallbacks() {
        let check = HealthCheck {
            name: "tcp".to_string(),
            probe: HealthProbe::Tcp { port: 5432 },
            interval: None,
            timeout: None,
            failure_threshold: Some(1),
            success_threshold: None,
        };
        let mut tracker = HealthTracker::with_defaults(&check, 5, 2, 3);
        assert_eq!(tracker.record(ProbeResult::Failed, 1), HealthStatus::Unhealthy);
        assert_eq!(tracker.record(ProbeResult::Healthy, 2), HealthStatus::Unhealthy);
        assert_eq!(tracker.record(ProbeResult::Healthy, 3), HealthStatus::Healthy);
    }

    #[test]
    fn result_carries_counters() {
        let mut tracker = HealthTracker::with_thresholds(3, 1, 10);
        tracker.record(ProbeResult::Healthy, 40);
        tracker.record(ProbeResult::Healthy, 50);
        let result = tracker.result("http", Some("eu-1"));
        assert_eq!(result.name, "http");
        assert_eq!(result.cluster_name.as_deref(), Some("eu-1"));
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.score, 100);
        assert_eq!(result.consecutive_successes, 2);
        assert_eq!(result.last_check_time, Some(50));
    }
}
