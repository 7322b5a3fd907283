//! `squary simplify`: Compute the transfers that clear all balances.

use clap::Args;
use squary_core::{simplify_debts, to_token_debts, Debt};
use squary_settlement::SettlementConfig;
use std::path::PathBuf;

use crate::group_file::GroupFile;

#[derive(Args, Debug)]
pub struct SimplifyArgs {
    /// Group document (JSON).
    pub file: PathBuf,

    /// Override the token decimals used for unit conversion.
    #[arg(long)]
    pub decimals: Option<u32>,

    /// Print JSON instead of a list.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &SimplifyArgs, config: &SettlementConfig) -> anyhow::Result<()> {
    let file = GroupFile::load(&args.file)?;
    let debts = simplify_debts(&file.expenses)?;
    let decimals = args.decimals.unwrap_or(config.token.decimals);
    let token_debts = to_token_debts(&debts, decimals)?;
    tracing::debug!(expenses = file.expenses.len(), debts = debts.len(), "simplified");

    if args.json {
        let out = serde_json::json!({ "debts": debts, "token_debts": token_debts, "decimals": decimals });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if debts.is_empty() {
        println!("Nothing to settle.");
        return Ok(());
    }
    println!("{} transfer(s) settle {} expense(s):", debts.len(), file.expenses.len());
    for debt in &debts {
        println!("{}", debt_line(debt, &config.token.symbol));
    }
    Ok(())
}

/// One listing row; the amount keeps every significant decimal.
fn debt_line(debt: &Debt, symbol: &str) -> String {
    format!(
        "  {} owes {}: {} {}",
        debt.debtor.short(),
        debt.creditor.short(),
        debt.amount,
        symbol
    )
}
