//! Fixtures shared by the cross-crate integration tests.

use squary_core::{Address, Expense, Group, GroupId, Money};
use std::path::PathBuf;
use std::sync::Arc;

use squary_ledger::MemoryLedger;
use squary_settlement::{InternalContract, SettlementConfig, SettlementManager};

/// Deterministic member address `0xnnnn…nn`.
pub fn member(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

/// Settlement token address used by test groups.
pub fn token() -> Address {
    member(0xee)
}

pub fn expense(amount: Money, description: &str, paid_by: u8, shared_with: &[u8]) -> Expense {
    Expense::new(
        amount,
        description,
        member(paid_by),
        shared_with.iter().map(|n| member(*n)).collect(),
    )
    .expect("fixture expense must be valid")
}

/// Group of members `1..=size`.
pub fn group(size: u8, threshold: usize) -> Group {
    Group::new(
        GroupId::new(),
        "Integration",
        (1..=size).map(member).collect(),
        threshold,
        token(),
    )
    .expect("fixture group must be valid")
}

/// Manager over an in-memory ledger and the internal contract, with handles
/// to both for assertions.
pub fn in_memory_manager() -> (SettlementManager, Arc<MemoryLedger>, Arc<InternalContract>) {
    let ledger = Arc::new(MemoryLedger::new());
    let contract = Arc::new(InternalContract::new());
    let manager = SettlementManager::new(
        ledger.clone(),
        contract.clone(),
        SettlementConfig::default(),
    );
    (manager, ledger, contract)
}

/// Fresh scratch directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("squary-{tag}-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
