//! `squary settle`: Run a settlement end to end against the internal contract.
//!
//! The first member proposes and the others sign in order until the group's
//! threshold is reached. The CLI holds no wallet keys, so each signature is
//! the EIP-191 digest of the action hash standing in for a real signature.

use clap::Args;
use squary_ledger::{LedgerStore, MemoryLedger, RocksLedger};
use squary_settlement::{
    eth_signed_message_hash, InternalContract, ProposalOutcome, SettlementConfig,
    SettlementManager,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::group_file::GroupFile;

#[derive(Args, Debug)]
pub struct SettleArgs {
    /// Group document (JSON).
    pub file: PathBuf,

    /// Signatures required to execute (defaults to the document's, then all members).
    #[arg(short, long)]
    pub threshold: Option<usize>,

    /// Persist the ledger in a RocksDB directory instead of memory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

pub async fn run(args: &SettleArgs, config: SettlementConfig) -> anyhow::Result<()> {
    let file = GroupFile::load(&args.file)?;
    let group = file.to_group(args.threshold, config.token.address)?;

    let ledger: Arc<dyn LedgerStore> = match &args.data_dir {
        Some(dir) => Arc::new(RocksLedger::open(dir)?),
        None => Arc::new(MemoryLedger::new()),
    };
    let contract = Arc::new(InternalContract::new());
    let manager = SettlementManager::new(ledger.clone(), contract, config);

    manager.register_group(group.clone()).await?;
    for expense in file.expenses {
        ledger.add_expense(group.id, expense).await?;
    }

    let plan = manager.prepare(group.id).await?;
    println!("Settling group {} ({})", group.name, group.id);
    println!("  Nonce:       {}", plan.nonce);
    println!("  Action hash: {}", plan.action_hash_hex());
    for debt in &plan.token_debts {
        println!(
            "  {} -> {}: {} units",
            debt.debtor.short(),
            debt.creditor.short(),
            debt.amount
        );
    }
    println!();

    let approval = eth_signed_message_hash(&plan.action_hash).to_vec();
    let mut signers = group.members.iter();
    let proposer = signers
        .next()
        .ok_or_else(|| anyhow::anyhow!("group has no members"))?;

    let mut outcome = manager.propose(group.id, *proposer, approval.clone()).await?;
    println!("  Proposed by {}", proposer.short());
    for signer in signers {
        if matches!(outcome, ProposalOutcome::Settled(_)) {
            break;
        }
        outcome = manager.sign(group.id, *signer, approval.clone()).await?;
        println!("  Signed by   {}", signer.short());
    }

    match outcome {
        ProposalOutcome::Settled(receipt) => {
            println!();
            println!("Settlement confirmed!");
            println!("  Settlement: {}", receipt.settlement_id);
            println!("  Debts:      {}", receipt.debt_count);
            println!("  Total:      {} units", receipt.total);
            if let Some(tx_ref) = &receipt.tx_ref {
                println!("  Tx ref:     {}", tx_ref);
            }
        }
        ProposalOutcome::Pending(proposal) => {
            anyhow::bail!(
                "proposal stuck at {} of {} signatures",
                proposal.signature_count(),
                group.signature_threshold
            );
        }
    }
    Ok(())
}
