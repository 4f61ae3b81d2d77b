//! capt-ledger: match statistics with live leaderboards
//!
//! One-shot subcommands edit or query the ledger; `run` keeps the published
//! boards fresh until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use capt_ledger::cli::{self, Commands};
use capt_ledger::config::Config;
use capt_ledger::identity::{IdentityResolver, RosterResolver};
use capt_ledger::ledger::LedgerStore;
use capt_ledger::publish::{ArtifactRegistry, FileChannel, Publisher};
use capt_ledger::scheduler::Scheduler;
use capt_ledger::tracker::Tracker;

#[derive(Parser)]
#[command(name = "capt-ledger")]
#[command(about = "Match ledger, leaderboards and live published boards")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "capt-ledger.toml")]
    config: PathBuf,

    /// Data directory (overrides config file)
    #[arg(short, long, env = "CAPT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Artifact root of the file channel (overrides config file)
    #[arg(long, env = "CAPT_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("capt_ledger=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(artifact_dir) = cli.artifact_dir {
        config.boards.artifact_dir = artifact_dir;
    }

    let store = Arc::new(LedgerStore::open(
        &config.storage.ledger_path(),
        &config.storage.aggregate_path(),
    ));
    let publisher = Arc::new(Publisher::new(
        store.clone(),
        Arc::new(FileChannel::new(config.boards.artifact_dir.clone())),
        ArtifactRegistry::open(&config.storage.registry_path()),
        config.board_settings(),
    ));

    let resolver: Arc<dyn IdentityResolver> = match &config.identity.roster_file {
        Some(path) => Arc::new(RosterResolver::from_file(path)?),
        None => Arc::new(RosterResolver::default()),
    };

    let is_run = matches!(cli.command, Commands::Run);
    let mut settings = config.tracker_settings();
    settings.auto_refresh = is_run;
    let tracker = Tracker::new(store, publisher.clone(), resolver, settings);

    if is_run {
        return run(&config, publisher).await;
    }

    let refresh_after = cli.command.mutates();
    match cli::execute_command(&tracker, cli.command).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }

    // Spawned refreshes would be cut short when the runtime exits.
    if refresh_after {
        tracker.refresh_all().await;
    }
    Ok(())
}

async fn run(config: &Config, publisher: Arc<Publisher>) -> anyhow::Result<()> {
    info!(
        data_dir = %config.storage.data_dir.display(),
        artifact_dir = %config.boards.artifact_dir.display(),
        "Starting capt-ledger"
    );

    if !config.scheduler.enabled {
        warn!("Scheduler disabled, publishing once");
        publisher.refresh_all().await;
        return Ok(());
    }

    let scheduler = Scheduler::spawn(publisher, config.scheduler.interval());
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    scheduler.shutdown().await;
    Ok(())
}
