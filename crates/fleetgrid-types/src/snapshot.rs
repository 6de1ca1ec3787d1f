//! Snapshot records supplied by the external discovery collaborator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::selector::WorkloadReference;

/// Unique name of a member cluster.
pub type ClusterName = String;

/// A candidate cluster as seen by discovery at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub name: ClusterName,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Observed round-trip latency from the session's origin, if measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u32>,
    /// False when discovery reports the cluster out of capacity.
    #[serde(default = "default_true")]
    pub capacity_available: bool,
}

fn default_true() -> bool {
    true
}

impl ClusterInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            labels: BTreeMap::new(),
            location: None,
            latency_ms: None,
            capacity_available: true,
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_latency(mut self, latency_ms: u32) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// A workload as seen by discovery, with the labels of its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadInfo {
    pub reference: WorkloadReference,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub namespace_labels: BTreeMap<String, String>,
}
