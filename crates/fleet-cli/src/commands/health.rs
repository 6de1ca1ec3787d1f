use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

use fleetgrid_status::{
    HealthTracker, ProbeResult, aggregate_status, project_health_status, unhealthy_action,
};
use fleetgrid_types::{WorkloadHealthPolicy, WorkloadHealthPolicyStatus};
use fleetgrid_validate::Validate;

use crate::config::HealthConfig;
use crate::manifest::{self, Manifest};

/// One completed probe, as reported by whatever ran it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRecord {
    pub check: String,
    #[serde(default)]
    pub cluster: Option<String>,
    pub result: ProbeResult,
    pub at: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProbeLog {
    pub probes: Vec<ProbeRecord>,
}

/// Replay `log` through one tracker per (check, cluster) and project the status.
pub fn evaluate(
    policy: &WorkloadHealthPolicy,
    log: &ProbeLog,
    defaults: &HealthConfig,
) -> anyhow::Result<WorkloadHealthPolicyStatus> {
    let mut trackers: BTreeMap<(String, Option<String>), HealthTracker> = BTreeMap::new();
    for probe in &log.probes {
        let Some(check) = policy.spec.health_checks.iter().find(|c| c.name == probe.check) else {
            bail!("probe for unknown check {:?}", probe.check);
        };
        trackers
            .entry((probe.check.clone(), probe.cluster.clone()))
            .or_insert_with(|| {
                HealthTracker::with_defaults(
                    check,
                    defaults.failure_threshold(),
                    defaults.success_threshold(),
                    defaults.window(),
                )
            })
            .record(probe.result, probe.at);
    }

    let results = trackers
        .iter()
        .map(|((name, cluster), tracker)| tracker.result(name, cluster.as_deref()))
        .collect();
    Ok(project_health_status(policy, results))
}

fn load_policy(path: &Path) -> anyhow::Result<WorkloadHealthPolicy> {
    let policy = match manifest::load(path)?.into_iter().next() {
        Some(Manifest::WorkloadHealthPolicy(p)) => p,
        Some(other) => bail!("{} is a {}, expected WorkloadHealthPolicy", path.display(), other.kind()),
        None => bail!("{} holds no manifest", path.display()),
    };
    policy.admit()?;
    Ok(policy)
}

fn load_probes(path: &Path) -> anyhow::Result<ProbeLog> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

pub fn health(policy: &str, probes: &str, format: &str, defaults: &HealthConfig) -> anyhow::Result<()> {
    let policy = load_policy(Path::new(policy))?;
    let log = load_probes(Path::new(probes))?;
    let status = evaluate(&policy, &log, defaults)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        _ => {
            println!("Health for {}", policy.metadata.key());
            for r in status.results() {
                let cluster = r.cluster_name.as_deref().unwrap_or("-");
                println!(
                    "  {:<16} {:<12} {:?} (score {}, failures {})",
                    r.name, cluster, r.status, r.score, r.consecutive_failures
                );
            }
            println!(
                "  overall: {:?}, score {}",
                aggregate_status(status.results()),
                status.overall_health_score()
            );
            if let Some(action) = unhealthy_action(&policy, &status) {
                println!("  action: {action:?}");
            }
        }
    }
    Ok(())
}
