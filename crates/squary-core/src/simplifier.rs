//! Debt simplification.
//!
//! Reduces the pairwise shares of a group's unsettled expenses to a short
//! list of net debtor → creditor transfers. Pure and synchronous: the same
//! input snapshot always yields the same output, and nothing is shared
//! between calls.
//!
//! Pairing is greedy in address encounter order, so the exact debtor/creditor
//! pairs depend on the order of the input expenses. Only the per-address net
//! effect is guaranteed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::balance::{compute_balances, Balances};
use crate::error::CoreError;
use crate::expense::Expense;
use crate::types::{Address, Money};

/// A single net transfer that clears part of a debtor's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub debtor: Address,
    pub creditor: Address,
    /// Always positive, at the money scale.
    pub amount: Money,
}

impl fmt::Display for Debt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} owes {}: {}", self.debtor, self.creditor, self.amount)
    }
}

/// Simplify the unsettled expenses of a group into net debts.
///
/// Settled expenses are skipped. Callers are expected to have validated
/// every expense; see [`crate::expense::validate_all`]. Validated amounts
/// are bounded, but a sheet whose running totals leave the decimal range
/// still reports [`CoreError::BalanceOverflow`] rather than panicking.
pub fn simplify_debts(expenses: &[Expense]) -> Result<Vec<Debt>, CoreError> {
    simplify_balances(compute_balances(expenses)?)
}

/// Match debtors against creditors greedily until every balance is cleared.
///
/// Each debtor, in encounter order, pays the creditors in encounter order
/// `min(remaining debt, remaining credit)` until it reaches zero. Leftover
/// balances up to one minimal unit are tolerated; anything larger means the
/// sheet did not net out and is reported as [`CoreError::Consistency`].
pub fn simplify_balances(balances: Balances) -> Result<Vec<Debt>, CoreError> {
    let mut debtors: Vec<(Address, Money)> = balances
        .debtors()
        .into_iter()
        .map(|(a, m)| (a, m.abs().truncate()))
        .collect();
    let mut creditors: Vec<(Address, Money)> = balances
        .creditors()
        .into_iter()
        .map(|(a, m)| (a, m.truncate()))
        .collect();

    let mut debts = Vec::new();
    for (debtor, owed) in debtors.iter_mut() {
        for (creditor, credit) in creditors.iter_mut() {
            if owed.is_zero() {
                break;
            }
            if !credit.is_positive() {
                continue;
            }
            let amount = (*owed).min(*credit);
            if amount.is_positive() {
                debts.push(Debt {
                    debtor: *debtor,
                    creditor: *creditor,
                    amount,
                });
                *owed -= amount;
                *credit -= amount;
            }
        }
    }

    let residual = debtors
        .iter()
        .chain(creditors.iter())
        .find(|(_, m)| !m.is_negligible());
    if let Some(&(address, residual)) = residual {
        return Err(CoreError::Consistency { address, residual });
    }

    tracing::debug!(
        participants = balances.len(),
        debts = debts.len(),
        "simplified balances"
    );
    Ok(debts)
}

/// Total amount each address pays across `debts` (positive) or receives (negative).
pub fn net_flows(debts: &[Debt]) -> Result<Balances, CoreError> {
    let mut flows = Balances::new();
    for debt in debts {
        flows.credit(debt.debtor, debt.amount)?;
        flows.debit(debt.creditor, debt.amount)?;
    }
    Ok(flows)
}
