//! Net balance accumulation over unsettled expenses.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::expense::Expense;
use crate::types::{Address, Money};

/// Signed net balance per address, in first-encounter order.
///
/// Positive means the address is owed money; negative means it owes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    entries: Vec<(Address, Money)>,
    index: HashMap<Address, usize>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, address: Address) -> &mut Money {
        let next = self.entries.len();
        let idx = *self.index.entry(address).or_insert(next);
        if idx == next {
            self.entries.push((address, Money::ZERO));
        }
        &mut self.entries[idx].1
    }

    pub fn credit(&mut self, address: Address, amount: Money) -> Result<(), CoreError> {
        let slot = self.slot(address);
        *slot = slot
            .checked_add(amount)
            .ok_or(CoreError::BalanceOverflow(address))?;
        Ok(())
    }

    pub fn debit(&mut self, address: Address, amount: Money) -> Result<(), CoreError> {
        let slot = self.slot(address);
        *slot = slot
            .checked_sub(amount)
            .ok_or(CoreError::BalanceOverflow(address))?;
        Ok(())
    }

    /// Build a sheet from signed entries, merging repeated addresses.
    pub fn from_entries<I>(entries: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (Address, Money)>,
    {
        let mut balances = Balances::new();
        for (address, amount) in entries {
            balances.credit(address, amount)?;
        }
        Ok(balances)
    }

    /// Balance for `address`, zero if it never appeared.
    pub fn get(&self, address: &Address) -> Money {
        self.index
            .get(address)
            .map(|&i| self.entries[i].1)
            .unwrap_or(Money::ZERO)
    }

    pub fn entries(&self) -> &[(Address, Money)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, Money)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all positive balances.
    pub fn total_credit(&self) -> Money {
        self.iter().map(|(_, m)| m).filter(|m| m.is_positive()).sum()
    }

    /// Sum of the magnitudes of all negative balances.
    pub fn total_debit(&self) -> Money {
        self.iter().map(|(_, m)| m).filter(|m| m.is_negative()).sum::<Money>().abs()
    }

    /// Signed sum of every balance; zero when value is conserved.
    pub fn net(&self) -> Money {
        self.iter().map(|(_, m)| m).sum()
    }

    /// Addresses with a negative balance, in encounter order.
    pub fn debtors(&self) -> Vec<(Address, Money)> {
        self.iter().filter(|(_, m)| m.is_negative()).collect()
    }

    /// Addresses with a positive balance, in encounter order.
    pub fn creditors(&self) -> Vec<(Address, Money)> {
        self.iter().filter(|(_, m)| m.is_positive()).collect()
    }
}

/// Accumulate net balances from every unsettled expense.
///
/// Each participant is debited one truncated share and the payer is credited
/// that same share once per participant, so the result always nets to zero.
/// The truncation remainder stays with the payer's own share.
pub fn compute_balances(expenses: &[Expense]) -> Result<Balances, CoreError> {
    let mut balances = Balances::new();
    for expense in expenses.iter().filter(|e| !e.settled) {
        let share = expense.share();
        for member in &expense.shared_with {
            balances.debit(*member, share)?;
        }
        balances.credit(expense.paid_by, share * expense.shared_with.len())?;
    }
    Ok(balances)
}
