//! Aurum node: a minimal proof-of-stake-style cryptocurrency network
//! simulated in one process over a shared message bus.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod node;

use config::NodeConfig;
use node::Network;

/// Aurum proof-of-stake-style node.
#[derive(Parser, Debug)]
#[command(name = "aurum-node")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "aurum-node.toml")]
    config: PathBuf,

    /// Simulation duration in seconds (overrides the config file)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Aurum node v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::load(&args.config, &args)?;
    if args.write_config {
        config.save(&args.config)?;
        info!(path = %args.config.display(), "configuration written");
        return Ok(());
    }

    info!(node = %config.node_name, "configuration loaded");
    info!(
        clients = config.simulation.clients.len(),
        miners = config.simulation.miners.len(),
        duration_secs = config.simulation.duration_secs,
        "simulation"
    );

    let mut network = Network::build(&config);
    network.start();

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(config.simulation.duration_secs)) => {
            info!("simulation finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    network.report();
    network.shutdown();

    info!("Aurum node stopped");
    Ok(())
}
