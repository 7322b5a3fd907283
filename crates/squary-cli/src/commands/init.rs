//! `squary init`: Write a default configuration file.

use clap::Args;
use squary_settlement::{SettlementConfig, TokenConfig};
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Network preset (zksync-sepolia, zksync).
    #[arg(short, long, default_value = "zksync-sepolia")]
    pub network: String,

    /// Settlement token preset (USDT, USDC).
    #[arg(short, long, default_value = "USDT")]
    pub token: String,

    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() && !args.force {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    let mut config = SettlementConfig::for_network(&args.network)?;
    config.token = TokenConfig::preset(&args.token)
        .ok_or_else(|| anyhow::anyhow!("unknown token preset: {}", args.token))?;
    config.save(config_path)?;

    tracing::info!(path = %config_path.display(), network = %args.network, "wrote config");
    println!("Initialized Squary config at {}", config_path.display());
    println!("  Network:  {} (chain {})", config.network.name, config.network.chain_id);
    println!("  Contract: {}", config.contract.address);
    println!("  Token:    {} {}", config.token.symbol, config.token.address);
    Ok(())
}
