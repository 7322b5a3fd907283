//! Integration test: propose → sign → execute across ledger, settlement
//! manager, and the internal contract.

use rust_decimal_macros::dec;
use squary_core::{CoreError, Money, TokenAmount};
use squary_integration_tests::{expense, group, in_memory_manager, member};
use squary_ledger::{LedgerEvent, LedgerStore};
use squary_settlement::{settle_action_hash, ProposalOutcome, SettlementContract, SettlementError};

#[tokio::test]
async fn test_two_of_three_settlement() {
    let (manager, ledger, contract) = in_memory_manager();
    let g = group(3, 2);
    manager.register_group(g.clone()).await.unwrap();

    ledger
        .add_expense(g.id, expense(Money::new(dec!(90)), "Dinner", 1, &[2, 3]))
        .await
        .unwrap();
    ledger
        .add_expense(g.id, expense(Money::new(dec!(30)), "Taxi", 2, &[1]))
        .await
        .unwrap();

    let plan = manager.prepare(g.id).await.unwrap();
    assert_eq!(
        plan.action_hash,
        settle_action_hash(&g.id, &plan.token_debts, 0)
    );

    let outcome = manager.propose(g.id, member(1), vec![0x01]).await.unwrap();
    let proposal = match outcome {
        ProposalOutcome::Pending(p) => p,
        other => panic!("expected pending proposal, got {other:?}"),
    };
    assert_eq!(proposal.action_hash, plan.action_hash);
    assert_eq!(proposal.expense_ids, plan.expense_ids);

    let receipt = match manager.sign(g.id, member(3), vec![0x03]).await.unwrap() {
        ProposalOutcome::Settled(r) => r,
        other => panic!("expected settlement, got {other:?}"),
    };
    assert_eq!(receipt.nonce, 0);
    assert_eq!(receipt.debt_count, plan.token_debts.len());

    // Member 1 paid 60 for others and owes 15: net +45 → 45 USDT in units.
    assert_eq!(contract.get_balance(g.id, &member(1)), 45_000_000);
    assert_eq!(contract.group_nonce(g.id).await.unwrap(), 1);
    assert!(ledger.unsettled_expenses(g.id).await.unwrap().is_empty());
    assert!(ledger.active_proposal(g.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_round_uses_next_nonce() {
    let (manager, ledger, _contract) = in_memory_manager();
    let g = group(2, 1);
    manager.register_group(g.clone()).await.unwrap();

    ledger
        .add_expense(g.id, expense(Money::new(dec!(10)), "Milk", 1, &[2]))
        .await
        .unwrap();
    let first = manager.propose(g.id, member(2), vec![2]).await.unwrap();
    assert!(matches!(first, ProposalOutcome::Settled(ref r) if r.nonce == 0));

    ledger
        .add_expense(g.id, expense(Money::new(dec!(10)), "Eggs", 1, &[2]))
        .await
        .unwrap();
    let plan = manager.prepare(g.id).await.unwrap();
    assert_eq!(plan.nonce, 1);

    let second = manager.propose(g.id, member(1), vec![1]).await.unwrap();
    assert!(matches!(second, ProposalOutcome::Settled(ref r) if r.nonce == 1));
}

#[tokio::test]
async fn test_ledger_events_track_the_flow() {
    let (manager, ledger, _contract) = in_memory_manager();
    let g = group(2, 2);
    manager.register_group(g.clone()).await.unwrap();
    let mut events = ledger.subscribe();

    ledger
        .add_expense(g.id, expense(Money::new(dec!(20)), "Pizza", 1, &[2]))
        .await
        .unwrap();
    manager.propose(g.id, member(1), vec![1]).await.unwrap();
    manager.sign(g.id, member(2), vec![2]).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.group_id(), g.id);
        seen.push(event);
    }
    assert!(matches!(seen[0], LedgerEvent::ExpenseAdded { .. }));
    assert!(seen.contains(&LedgerEvent::ProposalUpdated {
        group_id: g.id,
        signatures: 2
    }));
    assert!(seen.contains(&LedgerEvent::ExpensesSettled {
        group_id: g.id,
        count: 1
    }));
    assert_eq!(seen.last(), Some(&LedgerEvent::ProposalRemoved(g.id)));
}

#[tokio::test]
async fn test_concurrent_signers_all_recorded() {
    let (manager, ledger, contract) = in_memory_manager();
    let manager = std::sync::Arc::new(manager);
    let g = group(5, 5);
    manager.register_group(g.clone()).await.unwrap();
    ledger
        .add_expense(g.id, expense(Money::new(dec!(100)), "Boat", 1, &[2, 3, 4, 5]))
        .await
        .unwrap();
    manager.propose(g.id, member(1), vec![1]).await.unwrap();

    let mut handles = Vec::new();
    for n in 2..=5u8 {
        let manager = manager.clone();
        let group_id = g.id;
        handles.push(tokio::spawn(async move {
            manager.sign(group_id, member(n), vec![n]).await
        }));
    }
    let mut settled = 0;
    for handle in handles {
        if let ProposalOutcome::Settled(receipt) = handle.await.unwrap().unwrap() {
            assert_eq!(receipt.total, TokenAmount(80_000_000));
            settled += 1;
        }
    }

    assert_eq!(settled, 1);
    assert_eq!(contract.get_balance(g.id, &member(1)), 80_000_000);
}

#[tokio::test]
async fn test_invalid_expense_never_reaches_ledger() {
    let (manager, ledger, _contract) = in_memory_manager();
    let g = group(2, 1);
    manager.register_group(g.clone()).await.unwrap();

    let mut bad = expense(Money::new(dec!(5)), "Snacks", 1, &[2]);
    bad.description = "12345".into();
    let result = ledger.add_expense(g.id, bad).await;
    assert!(result.is_err());

    let outsider = expense(Money::new(dec!(5)), "Snacks", 1, &[9]);
    let result = ledger.add_expense(g.id, outsider).await;
    assert!(result.is_err());

    assert!(matches!(
        manager.prepare(g.id).await,
        Err(SettlementError::NothingToSettle(_))
    ));
}

#[tokio::test]
async fn test_non_member_proposer_rejected() {
    let (manager, ledger, _contract) = in_memory_manager();
    let g = group(2, 1);
    manager.register_group(g.clone()).await.unwrap();
    ledger
        .add_expense(g.id, expense(Money::new(dec!(5)), "Snacks", 1, &[2]))
        .await
        .unwrap();

    let result = manager.propose(g.id, member(9), vec![9]).await;
    assert!(matches!(
        result,
        Err(SettlementError::Core(CoreError::NotMember(_)))
    ));
    assert!(ledger.active_proposal(g.id).await.unwrap().is_none());
}
