//! Integration test: settlement state survives reopening the RocksDB ledger.

use rust_decimal_macros::dec;
use squary_core::Money;
use squary_integration_tests::{expense, group, member, temp_dir};
use squary_ledger::{LedgerStore, RocksLedger};
use squary_settlement::{
    InternalContract, ProposalOutcome, SettlementConfig, SettlementManager,
};
use std::sync::Arc;

#[tokio::test]
async fn test_pending_proposal_survives_restart() {
    let dir = temp_dir("persist");
    let contract = Arc::new(InternalContract::new());
    let g = group(3, 2);

    {
        let ledger = Arc::new(RocksLedger::open(&dir).unwrap());
        let manager =
            SettlementManager::new(ledger.clone(), contract.clone(), SettlementConfig::default());
        manager.register_group(g.clone()).await.unwrap();
        ledger
            .add_expense(g.id, expense(Money::new(dec!(60)), "Fuel", 2, &[1, 3]))
            .await
            .unwrap();
        let outcome = manager.propose(g.id, member(2), vec![2]).await.unwrap();
        assert!(matches!(outcome, ProposalOutcome::Pending(_)));
    }

    let ledger = Arc::new(RocksLedger::open(&dir).unwrap());
    let proposal = ledger
        .active_proposal(g.id)
        .await
        .unwrap()
        .expect("proposal persisted");
    assert_eq!(proposal.signature_count(), 1);

    let manager = SettlementManager::new(ledger.clone(), contract.clone(), SettlementConfig::default());
    let outcome = manager.sign(g.id, member(1), vec![1]).await.unwrap();
    assert!(matches!(outcome, ProposalOutcome::Settled(_)));

    let expenses = ledger.list_expenses(g.id).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert!(expenses[0].expense.settled);
    assert_eq!(contract.get_balance(g.id, &member(2)), 40_000_000);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_expense_order_preserved_across_restart() {
    let dir = temp_dir("order");
    let g = group(3, 1);
    let mut ids = Vec::new();
    {
        let ledger = RocksLedger::open(&dir).unwrap();
        ledger.create_group(g.clone()).await.unwrap();
        for (i, payer) in [1u8, 2, 3, 1].iter().enumerate() {
            let others: Vec<u8> = (1..=3).filter(|n| n != payer).collect();
            let e = expense(Money::from_i64(10 + i as i64), "Round", *payer, &others);
            ids.push(ledger.add_expense(g.id, e).await.unwrap());
        }
    }

    let ledger = RocksLedger::open(&dir).unwrap();
    let listed: Vec<_> = ledger
        .list_expenses(g.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(listed, ids);

    std::fs::remove_dir_all(&dir).ok();
}
