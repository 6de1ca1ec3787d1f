//! Traffic splitting across clusters serving the same workload.

use serde::{Deserialize, Serialize};

/// Required weight sum for a non-empty [`TrafficSplitting`].
pub const TRAFFIC_WEIGHT_TOTAL: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterWeight {
    pub cluster_name: String,
    /// Share of traffic in `[0, 100]`.
    pub weight: i32,
}

impl ClusterWeight {
    pub fn new(cluster_name: &str, weight: i32) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            weight,
        }
    }
}

/// Weighted distribution of requests over clusters.
///
/// An empty list is the "unset" state, not a violation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSplitting {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<ClusterWeight>,
}

impl TrafficSplitting {
    pub fn from_weights<'a>(weights: impl IntoIterator<Item = (&'a str, i32)>) -> Self {
        Self {
            clusters: weights
                .into_iter()
                .map(|(name, weight)| ClusterWeight::new(name, weight))
                .collect(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Sum of all weights, widened so malformed input cannot overflow.
    pub fn total_weight(&self) -> i64 {
        self.clusters.iter().map(|c| i64::from(c.weight)).sum()
    }

    pub fn weight_of(&self, cluster: &str) -> Option<i32> {
        self.clusters
            .iter()
            .find(|c| c.cluster_name == cluster)
            .map(|c| c.weight)
    }

    /// Map a point in `[0, 100)` onto a cluster by cumulative weight.
    ///
    /// Zero-weight clusters never receive traffic. Returns `None` when the
    /// split is unset or `point` falls past the last cumulative bound.
    pub fn pick(&self, point: u32) -> Option<&str> {
        let point = i64::from(point);
        let mut upper = 0i64;
        for entry in &self.clusters {
            upper += i64::from(entry.weight.max(0));
            if point < upper {
                return Some(&entry.cluster_name);
            }
        }
        None
    }
}

/// Staged and live traffic distribution for one workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStatus {
    /// Desired split, not yet serving.
    #[serde(default)]
    pub target: TrafficSplitting,
    /// Split currently serving traffic.
    #[serde(default)]
    pub active: TrafficSplitting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_promoted_at: Option<u64>,
}
