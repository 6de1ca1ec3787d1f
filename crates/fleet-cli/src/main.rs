use std::path::Path;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod manifest;

use config::FleetConfig;

#[derive(Parser)]
#[command(
    name = "fleetctl",
    about = "FleetGrid — multi-cluster workload placement",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to fleet.toml (defaults apply when the file is missing)
    #[arg(long, global = true, default_value = "fleet.toml")]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fleet.toml scaffold
    Init {
        #[arg(short, long, default_value = ".")]
        path: String,
    },
    /// Validate manifests in a file or directory.
    ///
    /// Files ending in .json or .toml are loaded; each manifest names its
    /// kind in a `kind` field. Exits non-zero when any manifest is invalid.
    Validate {
        path: String,
        /// Output format: text or json (overrides [output].format)
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Compute a placement plan for a WorkloadPlacementAdvanced policy
    Place {
        /// Policy manifest
        #[arg(short, long)]
        policy: String,
        /// Discovery snapshot (JSON with `workload` and `clusters`)
        #[arg(short, long)]
        clusters: String,
        /// Decision time in unix seconds (default: now)
        #[arg(long)]
        now: Option<u64>,
        /// Output format: text or json (overrides [output].format)
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Replay probe outcomes against a WorkloadHealthPolicy
    Health {
        /// Policy manifest
        #[arg(short, long)]
        policy: String,
        /// Probe log (JSON with a `probes` array)
        #[arg(long)]
        probes: String,
        /// Output format: text or json (overrides [output].format)
        #[arg(short, long)]
        format: Option<String>,
    },
}

/// Info for the CLI and every `fleetgrid_*` library on top of `RUST_LOG`.
fn log_filter(base: EnvFilter) -> anyhow::Result<EnvFilter> {
    Ok(base
        .add_directive("fleetctl=info".parse()?)
        .add_directive("fleetgrid=info".parse()?))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env())?)
        .init();

    let cli = Cli::parse();
    let config = FleetConfig::load_or_default(Path::new(&cli.config))?;

    match cli.command {
        Commands::Init { path } => commands::init::init(&path),
        Commands::Validate { path, format } => {
            let format = format.unwrap_or_else(|| config.output.format.clone());
            commands::validate::validate(&path, &format)
        }
        Commands::Place { policy, clusters, now, format } => {
            let format = format.unwrap_or_else(|| config.output.format.clone());
            commands::place::place(&policy, &clusters, now, &format, &config.placement_options())
        }
        Commands::Health { policy, probes, format } => {
            let format = format.unwrap_or_else(|| config.output.format.clone());
            commands::health::health(&policy, &probes, &format, &config.health)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn library_events_are_logged_by_default() {
        let filter = log_filter(EnvFilter::new("warn")).unwrap().to_string().to_lowercase();
        assert!(filter.contains("fleetctl=info"));
        assert!(filter.contains("fleetgrid=info"));
    }

    #[test]
    fn format_flag_is_optional() {
        let cli = Cli::try_parse_from(["fleetctl", "validate", "manifests/"]).unwrap();
        assert_eq!(cli.config, "fleet.toml");
        assert!(matches!(cli.command, Commands::Validate { format: None, .. }));
    }
}
