//! `squary balances`: Show net balances over unsettled expenses.

use clap::Args;
use squary_core::compute_balances;
use std::path::PathBuf;

use crate::group_file::GroupFile;

#[derive(Args, Debug)]
pub struct BalancesArgs {
    /// Group document (JSON).
    pub file: PathBuf,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &BalancesArgs) -> anyhow::Result<()> {
    let file = GroupFile::load(&args.file)?;
    let balances = compute_balances(&file.expenses)?;

    if args.json {
        let rows: Vec<_> = balances
            .iter()
            .map(|(address, amount)| serde_json::json!({ "address": address, "balance": amount }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if balances.is_empty() {
        println!("No unsettled expenses.");
        return Ok(());
    }
    for (address, amount) in balances.iter() {
        let label = if amount.is_positive() {
            "is owed"
        } else if amount.is_negative() {
            "owes"
        } else {
            "is even"
        };
        println!("  {:<44} {:>8} {}", address.to_string(), label, amount.abs());
    }
    Ok(())
}
