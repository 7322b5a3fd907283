//! Integration test: debt simplification over realistic group histories.
//!
//! Exercises squary-core's balances, simplifier, and unit conversion together.

use proptest::prelude::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use squary_core::{
    compute_balances, net_flows, simplify_debts, to_token_debts, Expense, Money, TokenAmount,
};
use squary_integration_tests::{expense, member};

/// A week of shared flat expenses between four members.
fn flat_week() -> Vec<Expense> {
    vec![
        expense(Money::new(dec!(120)), "Groceries", 1, &[2, 3, 4]),
        expense(Money::new(dec!(45.50)), "Internet", 2, &[1, 3, 4]),
        expense(Money::new(dec!(30)), "Cleaning", 3, &[1]),
        expense(Money::new(dec!(99.99)), "Power", 4, &[1, 2, 3]),
        expense(Money::new(dec!(10)), "Coffee", 1, &[4]),
    ]
}

// =========================================================================
// Properties of the simplified debt list
// =========================================================================

#[test]
fn test_debts_clear_every_balance() {
    let expenses = flat_week();
    let balances = compute_balances(&expenses).unwrap();
    let debts = simplify_debts(&expenses).expect("balances net out");

    let flows = net_flows(&debts).unwrap();
    for (address, balance) in balances.iter() {
        assert_eq!(
            balance + flows.get(&address),
            Money::ZERO,
            "{address} left with a residual"
        );
    }
}

#[test]
fn test_debts_are_positive_and_never_self_directed() {
    let debts = simplify_debts(&flat_week()).unwrap();
    assert!(!debts.is_empty());
    for debt in &debts {
        assert!(debt.amount.is_positive());
        assert_ne!(debt.debtor, debt.creditor);
    }
}

#[test]
fn test_debt_count_bounded_by_participants() {
    let expenses = flat_week();
    let participants = compute_balances(&expenses).unwrap().len();
    let debts = simplify_debts(&expenses).unwrap();
    assert!(debts.len() < participants);
}

#[test]
fn test_identical_input_gives_identical_output() {
    let expenses = flat_week();
    let first = simplify_debts(&expenses).unwrap();
    for _ in 0..5 {
        assert_eq!(simplify_debts(&expenses).unwrap(), first);
    }
}

#[test]
fn test_settled_history_is_ignored() {
    let mut expenses = flat_week();
    for e in expenses.iter_mut() {
        e.settled = true;
    }
    assert!(simplify_debts(&expenses).unwrap().is_empty());

    expenses.push(expense(Money::new(dec!(8)), "Bread", 2, &[3]));
    let debts = simplify_debts(&expenses).unwrap();
    assert_eq!(debts.len(), 1);
    assert_eq!(debts[0].debtor, member(3));
    assert_eq!(debts[0].creditor, member(2));
    assert_eq!(debts[0].amount, Money::new(dec!(4)));
}

// =========================================================================
// Properties over random expense sets
// =========================================================================

/// One generated expense: cents, payer index, participant bitmask, settled flag.
type ExpenseSpec = (u64, usize, u8, bool);

fn build_expenses(member_count: usize, specs: &[ExpenseSpec]) -> Vec<Expense> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(cents, payer_idx, mask, settled))| {
            let payer = (payer_idx % member_count) as u8 + 1;
            let mut shared: Vec<u8> = (0..member_count)
                .filter(|bit| mask & (1 << bit) != 0)
                .map(|bit| bit as u8 + 1)
                .filter(|n| *n != payer)
                .collect();
            if shared.is_empty() {
                shared.push((payer as usize % member_count) as u8 + 1);
            }
            let mut e = expense(
                Money::new(Decimal::new(cents as i64, 2)),
                &format!("Item {i}"),
                payer,
                &shared,
            );
            e.settled = settled;
            e
        })
        .collect()
}

fn expense_specs() -> impl Strategy<Value = Vec<ExpenseSpec>> {
    prop::collection::vec((1u64..=1_000_000, 0usize..6, 1u8..=63, any::<bool>()), 0..=25)
}

proptest! {
    #[test]
    fn debts_clear_each_member_balance(
        member_count in 2usize..=6,
        specs in expense_specs(),
    ) {
        let expenses = build_expenses(member_count, &specs);
        let balances = compute_balances(&expenses).unwrap();
        prop_assert_eq!(balances.net(), Money::ZERO);

        let debts = simplify_debts(&expenses).unwrap();
        let flows = net_flows(&debts).unwrap();
        for (address, balance) in balances.iter() {
            // debtors pay out exactly their debt, creditors take in exactly their credit
            prop_assert_eq!(balance + flows.get(&address), Money::ZERO);
        }
        for debt in &debts {
            prop_assert!(debt.amount.is_positive());
            prop_assert_ne!(debt.debtor, debt.creditor);
        }
    }

    #[test]
    fn simplify_is_idempotent(
        member_count in 2usize..=6,
        specs in expense_specs(),
    ) {
        let expenses = build_expenses(member_count, &specs);
        let first = simplify_debts(&expenses).unwrap();
        prop_assert_eq!(simplify_debts(&expenses).unwrap(), first);
    }

    #[test]
    fn settled_expenses_never_contribute(
        member_count in 2usize..=6,
        specs in expense_specs(),
    ) {
        let expenses = build_expenses(member_count, &specs);
        let unsettled: Vec<Expense> = expenses.iter().filter(|e| !e.settled).cloned().collect();
        prop_assert_eq!(
            simplify_debts(&expenses).unwrap(),
            simplify_debts(&unsettled).unwrap()
        );
        prop_assert_eq!(
            compute_balances(&expenses).unwrap(),
            compute_balances(&unsettled).unwrap()
        );
    }
}

// =========================================================================
// Conversion to token units
// =========================================================================

#[rstest]
#[case::usdt_six_decimals(6, 30_000_000)]
#[case::eighteen_decimals(18, 30_000_000_000_000_000_000)]
#[case::no_decimals(0, 30)]
fn test_token_units_follow_decimals(#[case] decimals: u32, #[case] expected: u128) {
    let expenses = vec![expense(Money::new(dec!(90)), "Dinner", 1, &[2, 3])];
    let debts = simplify_debts(&expenses).unwrap();
    let token_debts = to_token_debts(&debts, decimals).unwrap();
    assert_eq!(token_debts.len(), 2);
    assert!(token_debts.iter().all(|d| d.amount == TokenAmount(expected)));
}

#[test]
fn test_uneven_split_converts_exactly() {
    // 100 / 3 truncates to 33.333333 per member.
    let expenses = vec![expense(Money::new(dec!(100)), "Tickets", 1, &[2, 3])];
    let debts = simplify_debts(&expenses).unwrap();
    let token_debts = to_token_debts(&debts, 6).unwrap();
    let total: u128 = token_debts.iter().map(|d| d.amount.value()).sum();
    assert_eq!(total, 66_666_666);
}
