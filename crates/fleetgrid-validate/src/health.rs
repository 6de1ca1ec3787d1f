//! Validation of workload health policies.

use fleetgrid_types::{
    HEALTH_SCORE_MAX, HEALTH_SCORE_MIN, HealthCheck, HealthProbe, WorkloadHealthPolicy,
    parse_duration,
};

use crate::common::{
    validate_cluster_selector, validate_dns_label, validate_duration, validate_metadata,
    validate_optional_range, validate_range, validate_required_string, validate_unique_names,
    validate_workload_selector,
};
use crate::field::{ErrorList, FieldError, FieldPath};

const THRESHOLD_MIN: i32 = 1;
const THRESHOLD_MAX: i32 = 10;

fn validate_port(port: i32, path: &FieldPath) -> ErrorList {
    validate_range(port, 1, 65535, path)
}

fn validate_probe(probe: &HealthProbe, path: &FieldPath) -> ErrorList {
    match probe {
        HealthProbe::Http {
            path: http_path,
            port,
            expected_status,
        } => {
            let mut errs = Vec::new();
            if http_path.is_empty() {
                errs.push(FieldError::required(path.child("path"), "HTTP path must be specified"));
            } else if !http_path.starts_with('/') {
                errs.push(FieldError::invalid(path.child("path"), http_path, "must start with '/'"));
            }
            errs.extend(validate_port(*port, &path.child("port")));
            errs.extend(validate_optional_range(
                *expected_status,
                100,
                599,
                &path.child("expectedStatus"),
            ));
            errs
        }
        HealthProbe::Tcp { port } => validate_port(*port, &path.child("port")),
        HealthProbe::Grpc { port, service } => {
            let mut errs = validate_port(*port, &path.child("port"));
            if let Some(service) = service {
                errs.extend(validate_required_string(service, &path.child("service"), "service"));
            }
            errs
        }
        HealthProbe::Command { command } => {
            let cmd_path = path.child("command");
            if command.is_empty() {
                return vec![FieldError::required(cmd_path, "command must not be empty")];
            }
            validate_required_string(&command[0], &cmd_path.index(0), "executable")
        }
    }
}

pub fn validate_health_check(check: &HealthCheck, path: &FieldPath) -> ErrorList {
    let mut errs = validate_dns_label(&check.name, &path.child("name"));
    errs.extend(validate_probe(&check.probe, &path.child("probe")));
    errs.extend(validate_duration(check.interval.as_deref(), &path.child("interval")));
    errs.extend(validate_duration(check.timeout.as_deref(), &path.child("timeout")));

    let interval = check.interval.as_deref().and_then(parse_duration);
    let timeout = check.timeout.as_deref().and_then(parse_duration);
    if let (Some(interval), Some(timeout)) = (interval, timeout) {
        if timeout > interval {
            errs.push(FieldError::invalid(
                path.child("timeout"),
                check.timeout.as_deref().unwrap_or_default(),
                "must not exceed interval",
            ));
        }
    }

    errs.extend(validate_optional_range(
        check.failure_threshold,
        THRESHOLD_MIN,
        THRESHOLD_MAX,
        &path.child("failureThreshold"),
    ));
    errs.extend(validate_optional_range(
        check.success_threshold,
        THRESHOLD_MIN,
        THRESHOLD_MAX,
        &path.child("successThreshold"),
    ));
    errs
}

pub fn validate_workload_health_policy(policy: &WorkloadHealthPolicy) -> ErrorList {
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
        false,
    ));

    let checks = spec.child("healthChecks");
    if s.health_checks.is_empty() {
        errs.push(FieldError::required(checks.clone(), "at least one health check is required"));
    }
    for (i, check) in s.health_checks.iter().enumerate() {
        errs.extend(validate_health_check(check, &checks.index(i)));
    }
    errs.extend(validate_unique_names(
        s.health_checks.iter().map(|c| c.name.as_str()),
        &checks,
        "name",
    ));
    errs.extend(validate_optional_range(
        s.health_score_threshold,
        HEALTH_SCORE_MIN,
        HEALTH_SCORE_MAX,
        &spec.child("healthScoreThreshold"),
    ));
    errs
}
