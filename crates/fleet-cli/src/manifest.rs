//! Manifest loading: `.json` or `.toml` files, each tagged by `kind`.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::Deserialize;
use walkdir::WalkDir;

use fleetgrid_types::{
    SessionAffinityPolicy, SessionBindingConstraint, StickyBinding, WorkloadHealthPolicy,
    WorkloadPlacementAdvanced,
};
use fleetgrid_validate::{ErrorList, Validate};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Manifest {
    SessionAffinityPolicy(SessionAffinityPolicy),
    StickyBinding(StickyBinding),
    SessionBindingConstraint(SessionBindingConstraint),
    WorkloadPlacementAdvanced(WorkloadPlacementAdvanced),
    WorkloadHealthPolicy(WorkloadHealthPolicy),
}

impl Manifest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionAffinityPolicy(_) => SessionAffinityPolicy::KIND,
            Self::StickyBinding(_) => StickyBinding::KIND,
            Self::SessionBindingConstraint(_) => SessionBindingConstraint::KIND,
            Self::WorkloadPlacementAdvanced(_) => WorkloadPlacementAdvanced::KIND,
            Self::WorkloadHealthPolicy(_) => WorkloadHealthPolicy::KIND,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SessionAffinityPolicy(m) => m.name(),
            Self::StickyBinding(m) => m.name(),
            Self::SessionBindingConstraint(m) => m.name(),
            Self::WorkloadPlacementAdvanced(m) => m.name(),
            Self::WorkloadHealthPolicy(m) => m.name(),
        }
    }

    /// Run the validator matching this manifest's kind.
    pub fn validate(&self) -> ErrorList {
        match self {
            Self::SessionAffinityPolicy(m) => m.validate(),
            Self::StickyBinding(m) => m.validate(),
            Self::SessionBindingConstraint(m) => m.validate(),
            Self::WorkloadPlacementAdvanced(m) => m.validate(),
            Self::WorkloadHealthPolicy(m) => m.validate(),
        }
    }
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "toml")
    )
}

/// Manifest files under `path`, sorted. A file path is returned as is.
pub fn discover(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_manifest(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Parse one file. A JSON file may hold a single manifest or an array.
pub fn load(path: &Path) -> anyhow::Result<Vec<Manifest>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse(path, &content).with_context(|| format!("parsing {}", path.display()))
}

fn parse(path: &Path, content: &str) -> anyhow::Result<Vec<Manifest>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let value: serde_json::Value = serde_json::from_str(content)?;
            match value {
                serde_json::Value::Array(items) => Ok(items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<Manifest>, _>>()?),
                other => Ok(vec![serde_json::from_value(other)?]),
            }
        }
        Some("toml") => Ok(vec![toml::from_str(content)?]),
        _ => bail!("unsupported manifest extension"),
    }
}
