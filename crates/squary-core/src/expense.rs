use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CoreError;
use crate::types::{Address, Money, MAX_EXPENSE_AMOUNT};

/// A cost paid by one member and owed, in equal shares, by the others.
///
/// Immutable once recorded, except for the `settled` flag which flips once
/// the settlement transaction covering it is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Total amount paid, in whole token units.
    pub amount: Money,
    /// Free-text description; never empty and never purely numeric.
    pub description: String,
    /// Member who paid.
    pub paid_by: Address,
    /// Members sharing the cost with the payer (payer excluded).
    pub shared_with: Vec<Address>,
    /// Whether a confirmed settlement has already covered this expense.
    #[serde(default)]
    pub settled: bool,
    /// When the expense was recorded.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Expense {
    /// Build a validated, unsettled expense stamped with the current time.
    pub fn new(
        amount: Money,
        description: impl Into<String>,
        paid_by: Address,
        shared_with: Vec<Address>,
    ) -> Result<Self, CoreError> {
        let expense = Self {
            amount,
            description: description.into(),
            paid_by,
            shared_with,
            settled: false,
            timestamp: Utc::now(),
        };
        validate_expense(&expense)?;
        Ok(expense)
    }

    /// Number of people the amount is split between, payer included.
    pub fn participant_count(&self) -> usize {
        self.shared_with.len() + 1
    }

    /// Per-participant share, truncated at the money scale.
    pub fn share(&self) -> Money {
        self.amount.split(self.participant_count())
    }

    /// Whether `address` pays or shares in this expense.
    pub fn involves(&self, address: &Address) -> bool {
        self.paid_by == *address || self.shared_with.contains(address)
    }
}

/// Whether a description is nothing but ASCII digits.
fn is_numeric_only(description: &str) -> bool {
    !description.is_empty() && description.chars().all(|c| c.is_ascii_digit())
}

/// Reject expense shapes that must never reach the simplifier.
pub fn validate_expense(expense: &Expense) -> Result<(), CoreError> {
    if !expense.amount.is_positive() {
        return Err(CoreError::Validation(format!(
            "amount must be positive, got {}",
            expense.amount
        )));
    }
    if expense.amount > MAX_EXPENSE_AMOUNT {
        return Err(CoreError::Validation(format!(
            "amount {} exceeds the maximum of {MAX_EXPENSE_AMOUNT}",
            expense.amount
        )));
    }

    let description = expense.description.trim();
    if description.is_empty() {
        return Err(CoreError::Validation("description cannot be empty".into()));
    }
    if is_numeric_only(description) {
        return Err(CoreError::Validation(format!(
            "description cannot be only numbers: {description}"
        )));
    }

    if expense.shared_with.is_empty() {
        return Err(CoreError::Validation(
            "expense must be shared with at least one member".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(expense.shared_with.len());
    for member in &expense.shared_with {
        if *member == expense.paid_by {
            return Err(CoreError::Validation(format!(
                "payer {member} cannot also be in shared_with"
            )));
        }
        if !seen.insert(member) {
            return Err(CoreError::Validation(format!(
                "duplicate participant {member}"
            )));
        }
    }

    Ok(())
}

/// Validate every expense before any of them is processed.
pub fn validate_all(expenses: &[Expense]) -> Result<(), CoreError> {
    for (index, expense) in expenses.iter().enumerate() {
        validate_expense(expense).map_err(|e| match e {
            CoreError::Validation(msg) => CoreError::Validation(format!("expense #{index}: {msg}")),
            other => other,
        })?;
    }
    Ok(())
}
