//! Squary CLI: simplify group debts and settle them.
//!
//! Subcommands: init, balances, simplify, settle.

mod commands;
mod group_file;

use clap::{Parser, Subcommand};
use squary_settlement::SettlementConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Squary: split group expenses, settle them in one batch.
#[derive(Parser, Debug)]
#[command(name = "squary", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "squary.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Show each member's net balance over unsettled expenses.
    Balances(commands::balances::BalancesArgs),
    /// Compute the minimal set of transfers that clears all balances.
    Simplify(commands::simplify::SimplifyArgs),
    /// Run a full propose/sign/execute settlement against the internal contract.
    Settle(commands::settle::SettleArgs),
}

fn init_tracing(config: &SettlementConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `init` must not fail on a broken existing config.
    let config = match &cli.command {
        Commands::Init(_) => SettlementConfig::default(),
        _ => SettlementConfig::load(&cli.config)?,
    };
    init_tracing(&config, cli.log_level.as_deref());

    match &cli.command {
        Commands::Init(args) => commands::init::run(args, &cli.config),
        Commands::Balances(args) => commands::balances::run(args),
        Commands::Simplify(args) => commands::simplify::run(args, &config),
        Commands::Settle(args) => commands::settle::run(args, config).await,
    }
}
