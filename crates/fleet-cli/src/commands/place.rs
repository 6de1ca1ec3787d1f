use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, bail};
use serde::Deserialize;

use fleetgrid_affinity::{LabelMatcher, PlacementOptions, PlacementPlan, compute_placement};
use fleetgrid_types::{ClusterInfo, WorkloadInfo};
use fleetgrid_validate::Validate;

use crate::manifest::{self, Manifest};

/// Discovery snapshot: the workload to place and the candidate clusters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementInput {
    pub workload: WorkloadInfo,
    pub clusters: Vec<ClusterInfo>,
}

/// Validate the policy and compute its plan against the snapshot.
pub fn plan(policy: &Path, clusters: &Path, now: u64, options: &PlacementOptions) -> anyhow::Result<PlacementPlan> {
    let placement = match manifest::load(policy)?.into_iter().next() {
        Some(Manifest::WorkloadPlacementAdvanced(p)) => p,
        Some(other) => bail!("{} is a {}, expected WorkloadPlacementAdvanced", policy.display(), other.kind()),
        None => bail!("{} holds no manifest", policy.display()),
    };
    placement.admit()?;

    let content = std::fs::read_to_string(clusters)
        .with_context(|| format!("reading {}", clusters.display()))?;
    let input: PlacementInput = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", clusters.display()))?;

    Ok(compute_placement(
        &placement.spec,
        &input.workload,
        &input.clusters,
        &LabelMatcher,
        now,
        options,
    )?)
}

pub fn place(
    policy: &str,
    clusters: &str,
    now: Option<u64>,
    format: &str,
    options: &PlacementOptions,
) -> anyhow::Result<()> {
    let plan = plan(Path::new(policy), Path::new(clusters), now.unwrap_or_else(epoch_secs), options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan.decisions())?);
        }
        _ => {
            println!("Placement for {}", plan.workload.key());
            for decision in plan.decisions() {
                println!("  ✓ {:<24} {}", decision.cluster_name, decision.reason);
            }
            for s in &plan.overflow {
                println!("  - {:<24} eligible (score {}), over cluster cap", s.cluster_name, s.score);
            }
            for e in &plan.excluded {
                println!("  ✗ {:<24} {}", e.cluster_name, e.reason);
            }
        }
    }
    Ok(())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
