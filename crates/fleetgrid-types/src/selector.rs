//! Selector value types — "which workloads" and "which clusters".
//!
//! Selectors only describe a target set. Evaluating them against a
//! concrete workload or cluster is the job of a matcher (see
//! `fleetgrid-affinity::matcher`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operator for a single label-selector requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// One `key <op> values` requirement inside a [`LabelSelector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: SelectorOperator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Label predicate: exact matches plus set-based expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

impl LabelSelector {
    /// Selector requiring every given `key=value` pair.
    pub fn from_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            match_expressions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }
}

/// An `(apiVersion, kind)` pair identifying a workload type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadType {
    pub api_version: String,
    pub kind: String,
}

/// Selects workloads. Every populated branch must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workload_types: Vec<WorkloadType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
}

impl WorkloadSelector {
    /// True iff no branch carries any criteria.
    pub fn is_empty(&self) -> bool {
        self.label_selector.as_ref().is_none_or(LabelSelector::is_empty)
            && self.workload_types.is_empty()
            && self
                .namespace_selector
                .as_ref()
                .is_none_or(LabelSelector::is_empty)
    }
}

/// Selects clusters. Every populated branch must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_names: Vec<String>,
}

impl ClusterSelector {
    pub fn by_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            cluster_names: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn by_locations<S: Into<String>>(locations: impl IntoIterator<Item = S>) -> Self {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn by_labels(selector: LabelSelector) -> Self {
        Self {
            label_selector: Some(selector),
            ..Default::default()
        }
    }

    /// True iff no branch carries any criteria.
    pub fn is_empty(&self) -> bool {
        self.label_selector.as_ref().is_none_or(LabelSelector::is_empty)
            && self.locations.is_empty()
            && self.cluster_names.is_empty()
    }
}

/// Reference to a single workload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl WorkloadReference {
    pub fn new(api_version: &str, kind: &str, name: &str, namespace: Option<&str>) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }

    /// Stable key used to index per-workload state: `kind/namespace/name`.
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}/{}", self.kind, ns, self.name),
            None => format!("{}/{}", self.kind, self.name),
        }
    }

    pub fn workload_type(&self) -> WorkloadType {
        WorkloadType {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
        }
    }
}
