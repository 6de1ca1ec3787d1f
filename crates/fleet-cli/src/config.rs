//! fleet.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

use fleetgrid_affinity::PlacementOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Cap applied when a placement sets no `maxClusters`.
    pub max_clusters: Option<u32>,
    /// Locations used when a placement's cluster selector is empty.
    #[serde(default)]
    pub default_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// `text` or `json`.
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

/// Fallbacks for health checks that leave their thresholds unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    pub failure_threshold: Option<u32>,
    pub success_threshold: Option<u32>,
    /// Probes kept for the sliding window score.
    pub window: Option<usize>,
}

impl HealthConfig {
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold.unwrap_or(3)
    }

    pub fn success_threshold(&self) -> u32 {
        self.success_threshold.unwrap_or(1)
    }

    pub fn window(&self) -> usize {
        self.window.unwrap_or(10)
    }
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FleetConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a fleet.toml with every section filled in.
    pub fn scaffold() -> Self {
        FleetConfig {
            placement: PlacementConfig {
                max_clusters: Some(3),
                default_locations: vec!["us-east-1".to_string()],
            },
            output: OutputConfig::default(),
            health: HealthConfig {
                failure_threshold: Some(3),
                success_threshold: Some(1),
                window: Some(10),
            },
        }
    }

    pub fn placement_options(&self) -> PlacementOptions {
        PlacementOptions {
            max_clusters: self.placement.max_clusters,
            default_locations: self.placement.default_locations.clone(),
        }
    }
}
