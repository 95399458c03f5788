use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use cycle_baseline::{BaselineStore, BlobStore, LocalStore, TagStore};
use cycle_core::CycleConfig;
use cycle_core::config::parse_duration;
use cycle_engine::{Driver, Outcome};
use cycle_provider::SimCloud;

#[derive(Parser)]
#[command(
    name = "groupcycle",
    about = "groupcycle — zero-downtime rolling replacement for elastic compute groups",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cycle a group's instances onto its active launch configuration.
    ///
    /// Polls the group until every obsolete instance has been replaced
    /// and the original MinSize/DesiredCapacity are restored. Safe to
    /// interrupt and re-run: the captured baseline survives restarts.
    Run {
        /// Region the group lives in
        #[arg(short, long)]
        region: Option<String>,
        /// Name of the compute group to cycle
        #[arg(short, long)]
        group: Option<String>,
        /// Path to groupcycle.toml
        #[arg(short, long)]
        config: Option<String>,
        /// Rehearse against an in-process simulated fleet seeded from
        /// this JSON file instead of a real provider
        #[arg(long)]
        fleet: Option<String>,
        /// Poll interval override, e.g. "30s"
        #[arg(long)]
        interval: Option<String>,
        /// Evaluate a single cycle, print the decision, and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cycle_engine=info".parse()?)
                .add_directive("cycle_baseline=info".parse()?)
                .add_directive("groupcycle=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            region,
            group,
            config,
            fleet,
            interval,
            once,
        } => run(region, group, config, fleet, interval, once).await,
    }
}

async fn run(
    region: Option<String>,
    group: Option<String>,
    config: Option<String>,
    fleet: Option<String>,
    interval: Option<String>,
    once: bool,
) -> anyhow::Result<()> {
    let mut cfg = match &config {
        Some(path) => CycleConfig::from_file(Path::new(path))
            .with_context(|| format!("loading {path}"))?,
        None => CycleConfig::default(),
    };
    if region.is_some() {
        cfg.region = region;
    }
    if group.is_some() {
        cfg.group = group;
    }
    if interval.is_some() {
        cfg.poll_interval = interval;
    }

    let Some(group) = cfg.group.clone() else {
        bail!("no group to cycle; pass --group or set `group` in the config file");
    };
    let region = cfg.region.clone().unwrap_or_else(|| "default".to_string());

    // Cloud SDK bindings are external collaborators; this binary ships
    // with the in-process simulator only.
    let Some(fleet_path) = fleet else {
        bail!(
            "no cloud provider is wired into this build; \
             pass --fleet <file> to rehearse against a simulated fleet"
        );
    };
    let seed = std::fs::read(&fleet_path).with_context(|| format!("reading {fleet_path}"))?;
    let sim = Arc::new(SimCloud::from_json(&seed)?);

    let baselines: Arc<dyn BaselineStore> = match cfg.baseline_backend() {
        "tags" => Arc::new(TagStore::new(sim.clone())),
        "local" => {
            let path = cfg
                .baseline
                .as_ref()
                .and_then(|b| b.path.as_deref())
                .unwrap_or("groupcycle-baselines.redb");
            Arc::new(BlobStore::new(Arc::new(LocalStore::open(Path::new(path))?)))
        }
        other => bail!("unknown baseline backend {other:?}; expected \"tags\" or \"local\""),
    };

    info!(%region, %group, "starting instance replacement");

    let mut driver = Driver::new(sim.clone(), sim, baselines, &group);
    if let Some(interval) = cfg.poll_interval.as_deref() {
        let parsed = parse_duration(interval)
            .with_context(|| format!("invalid poll interval {interval:?}"))?;
        driver = driver.with_poll_interval(parsed);
    }

    if once {
        let decision = driver.cycle().await?;
        println!("{decision}");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    match driver.run(shutdown_rx).await? {
        Outcome::Completed => {
            println!("cycled instances on: {group}");
            Ok(())
        }
        Outcome::Cancelled => {
            info!(%group, "interrupted; re-run to resume from the saved baseline");
            Ok(())
        }
    }
}
