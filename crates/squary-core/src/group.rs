use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CoreError;
use crate::expense::{validate_expense, Expense};
use crate::types::{Address, GroupId};

/// A set of members sharing expenses and one settlement contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Member addresses in the order they were added.
    pub members: Vec<Address>,
    /// Distinct member signatures required to execute a settlement.
    pub signature_threshold: usize,
    /// ERC-20 token the group settles in.
    pub token: Address,
}

impl Group {
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        members: Vec<Address>,
        signature_threshold: usize,
        token: Address,
    ) -> Result<Self, CoreError> {
        let group = Self {
            id,
            name: name.into(),
            members,
            signature_threshold,
            token,
        };
        group.validate()?;
        Ok(group)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("group name cannot be empty".into()));
        }
        if self.members.is_empty() {
            return Err(CoreError::Validation("group must have at least one member".into()));
        }
        let unique: HashSet<_> = self.members.iter().collect();
        if unique.len() != self.members.len() {
            return Err(CoreError::Validation("group members must be unique".into()));
        }
        if self.signature_threshold == 0 || self.signature_threshold > self.members.len() {
            return Err(CoreError::Validation(format!(
                "signature threshold must be between 1 and {}, got {}",
                self.members.len(),
                self.signature_threshold
            )));
        }
        Ok(())
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    /// Validate an expense's shape and that everyone involved belongs to the group.
    pub fn validate_expense(&self, expense: &Expense) -> Result<(), CoreError> {
        validate_expense(expense)?;
        std::iter::once(&expense.paid_by)
            .chain(expense.shared_with.iter())
            .find(|a| !self.is_member(a))
            .map_or(Ok(()), |a| Err(CoreError::NotMember(*a)))
    }
}
