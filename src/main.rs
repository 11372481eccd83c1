mod config;
mod error;
mod gateway;
mod inspect;
mod keystore;
mod logging;
mod program;
mod shutdown;
mod task;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

use crate::config::{Config, Settings, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use crate::gateway::solana::{SolanaConfig, SolanaGateway};
use crate::keystore::Keystore;
use crate::shutdown::ShutdownSignal;
use crate::task::{LoopExit, Task};

#[derive(Parser)]
#[command(name = "lsd-relay", about = "Drives the era lifecycle of LSD stake managers")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the relay until interrupted (default)
    Start,
    /// Print a stake manager and its stake pool as JSON, without submitting anything
    Inspect {
        /// Stake manager to describe; defaults to `stake_manager_address` from the config
        #[arg(long)]
        stake_manager: Option<String>,
    },
}

fn solana_gateway(settings: &Settings) -> Arc<SolanaGateway> {
    Arc::new(SolanaGateway::new(SolanaConfig::new(
        settings.rpc_url.clone(),
        settings.program_id,
    )))
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let keystore = Keystore::load(&settings.keystore_path)?;
    let gateway = solana_gateway(&settings);

    let shutdown = ShutdownSignal::new();
    let mut task = Task::new(&settings, &keystore, gateway, shutdown.clone())?;
    task.start();
    info!("relay task started");

    shutdown.wait_for_signal().await;

    task.stop();
    match task.join().await {
        Some(LoopExit::Escalated) => warn!("relay task gave up after repeated failures"),
        Some(LoopExit::Stopped) => info!("relay task stopped"),
        None => warn!("relay task exited abnormally"),
    }
    Ok(())
}

async fn run_inspect(settings: Settings, stake_manager: Option<String>) -> anyhow::Result<()> {
    let stake_manager = match stake_manager {
        Some(address) => Pubkey::from_str(address.trim())
            .with_context(|| format!("invalid stake manager address {}", address))?,
        None => settings
            .stake_manager
            .context("pass --stake-manager or set stake_manager_address in the config")?,
    };

    let gateway = solana_gateway(&settings);
    let report = inspect::stake_manager_report(gateway.as_ref(), &settings.program_id, &stake_manager).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let _log_guard = logging::init(&config.log_level, Path::new(&config.log_file_path))?;
    info!("config: {}", serde_json::to_string_pretty(&config)?);

    let settings = config.validate()?;
    match cli.command.unwrap_or(Command::Start) {
        Command::Start => {
            info!("Starting LSD relay");
            run(settings).await?;
            info!("LSD relay shut down");
        }
        Command::Inspect { stake_manager } => run_inspect(settings, stake_manager).await?,
    }
    Ok(())
}
