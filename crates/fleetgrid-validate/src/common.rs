//! Shared checks: bounded ranges, names, durations, selectors, metadata.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use fleetgrid_types::{
    ClusterSelector, LabelSelector, ObjectMeta, SelectorOperator, WorkloadSelector, parse_duration,
};

use crate::field::{ErrorList, FieldError, FieldPath};

const DNS1123_LABEL_MAX_LEN: usize = 63;

static DNS1123_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("DNS-1123 label pattern compiles")
});

/// Message used whenever a selector has no populated branch.
pub const EMPTY_SELECTOR: &str = "at least one selector field must be specified";

fn range_message(lo: i64, hi: i64) -> String {
    format!("must be between {lo} and {hi}, inclusive")
}

/// Closed-interval check for a mandatory integer.
pub fn validate_range(value: i32, lo: i32, hi: i32, path: &FieldPath) -> ErrorList {
    if (lo..=hi).contains(&value) {
        Vec::new()
    } else {
        vec![FieldError::invalid(
            path.clone(),
            value,
            range_message(lo.into(), hi.into()),
        )]
    }
}

/// Closed-interval check for an optional integer.
///
/// `None` and `Some(0)` mean "unset" and are never a violation, even when
/// zero lies below `lo`.
pub fn validate_optional_range(value: Option<i32>, lo: i32, hi: i32, path: &FieldPath) -> ErrorList {
    match value {
        None | Some(0) => Vec::new(),
        Some(v) => validate_range(v, lo, hi, path),
    }
}

/// Optional count that must not be negative.
pub fn validate_non_negative(value: Option<i32>, path: &FieldPath) -> ErrorList {
    match value {
        Some(v) if v < 0 => vec![FieldError::invalid(
            path.clone(),
            v,
            "must be greater than or equal to 0",
        )],
        _ => Vec::new(),
    }
}

/// Mandatory non-blank string.
pub fn validate_required_string(value: &str, path: &FieldPath, what: &str) -> ErrorList {
    if value.trim().is_empty() {
        vec![FieldError::required(path.clone(), format!("{what} must be specified"))]
    } else {
        Vec::new()
    }
}

pub fn is_dns1123_label(value: &str) -> bool {
    value.len() <= DNS1123_LABEL_MAX_LEN && DNS1123_LABEL.is_match(value)
}

/// Mandatory name that must be a DNS-1123 label.
pub fn validate_dns_label(value: &str, path: &FieldPath) -> ErrorList {
    if value.is_empty() {
        return vec![FieldError::required(path.clone(), "name must be specified")];
    }
    if is_dns1123_label(value) {
        Vec::new()
    } else {
        vec![FieldError::invalid(
            path.clone(),
            value,
            "must consist of lower case alphanumeric characters or '-', start and end \
             with an alphanumeric character, and be at most 63 characters",
        )]
    }
}

/// Optional duration string such as `"30s"` or `"5m"`.
pub fn validate_duration(value: Option<&str>, path: &FieldPath) -> ErrorList {
    match value {
        Some(s) if parse_duration(s).is_none() => vec![FieldError::invalid(
            path.clone(),
            s,
            "must be a duration such as \"500ms\", \"30s\", \"5m\" or \"1h\"",
        )],
        _ => Vec::new(),
    }
}

/// Report every repeated, non-empty name as a `Duplicate` at its index.
pub fn validate_unique_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    path: &FieldPath,
    field: &str,
) -> ErrorList {
    let mut seen = HashSet::new();
    let mut errs = Vec::new();
    for (i, name) in names.into_iter().enumerate() {
        if !name.is_empty() && !seen.insert(name) {
            errs.push(FieldError::duplicate(path.index(i).child(field), name));
        }
    }
    errs
}

pub fn validate_metadata(meta: &ObjectMeta, path: &FieldPath) -> ErrorList {
    let mut errs = validate_dns_label(&meta.name, &path.child("name"));
    if let Some(ns) = &meta.namespace {
        errs.extend(validate_dns_label(ns, &path.child("namespace")));
    }
    errs
}

pub fn validate_label_selector(selector: &LabelSelector, path: &FieldPath) -> ErrorList {
    let mut errs = Vec::new();
    for key in selector.match_labels.keys() {
        if key.trim().is_empty() {
            errs.push(FieldError::required(
                path.child("matchLabels"),
                "label keys must not be empty",
            ));
        }
    }
    let exprs = path.child("matchExpressions");
    for (i, req) in selector.match_expressions.iter().enumerate() {
        let p = exprs.index(i);
        errs.extend(validate_required_string(&req.key, &p.child("key"), "key"));
        match req.operator {
            SelectorOperator::In | SelectorOperator::NotIn => {
                if req.values.is_empty() {
                    errs.push(FieldError::required(
                        p.child("values"),
                        "must be specified when operator is In or NotIn",
                    ));
                }
            }
            SelectorOperator::Exists | SelectorOperator::DoesNotExist => {
                if !req.values.is_empty() {
                    errs.push(FieldError::invalid(
                        p.child("values"),
                        req.values.join(","),
                        "may not be specified when operator is Exists or DoesNotExist",
                    ));
                }
            }
        }
    }
    errs
}

/// Validate a workload selector; `required` gates the empty-selector error.
pub fn validate_workload_selector(
    selector: Option<&WorkloadSelector>,
    path: &FieldPath,
    required: bool,
) -> ErrorList {
    let selector = match selector {
        Some(s) if !s.is_empty() => s,
        _ if required => return vec![FieldError::required(path.clone(), EMPTY_SELECTOR)],
        _ => return Vec::new(),
    };

    let mut errs = Vec::new();
    if let Some(labels) = &selector.label_selector {
        errs.extend(validate_label_selector(labels, &path.child("labelSelector")));
    }
    if let Some(ns) = &selector.namespace_selector {
        errs.extend(validate_label_selector(ns, &path.child("namespaceSelector")));
    }
    let types = path.child("workloadTypes");
    for (i, wt) in selector.workload_types.iter().enumerate() {
        let p = types.index(i);
        errs.extend(validate_required_string(&wt.api_version, &p.child("apiVersion"), "apiVersion"));
        errs.extend(validate_required_string(&wt.kind, &p.child("kind"), "kind"));
    }
    errs
}

/// Validate a cluster selector; `required` gates the empty-selector error.
pub fn validate_cluster_selector(
    selector: Option<&ClusterSelector>,
    path: &FieldPath,
    required: bool,
) -> ErrorList {
    let selector = match selector {
        Some(s) if !s.is_empty() => s,
        _ if required => return vec![FieldError::required(path.clone(), EMPTY_SELECTOR)],
        _ => return Vec::new(),
    };

    let mut errs = Vec::new();
    if let Some(labels) = &selector.label_selector {
        errs.extend(validate_label_selector(labels, &path.child("labelSelector")));
    }
    let locations = path.child("locations");
    for (i, loc) in selector.locations.iter().enumerate() {
        errs.extend(validate_required_string(loc, &locations.index(i), "location"));
    }
    let names = path.child("clusterNames");
    for (i, name) in selector.cluster_names.iter().enumerate() {
        errs.extend(validate_dns_label(name, &names.index(i)));
    }
    errs
}
