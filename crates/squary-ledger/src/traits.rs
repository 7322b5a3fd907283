use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use squary_core::{Address, Expense, ExpenseId, Group, GroupId, SettleProposal};
use tokio::sync::broadcast;

use crate::error::LedgerError;

/// An expense as recorded in the ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredExpense {
    pub id: ExpenseId,
    pub group_id: GroupId,
    pub expense: Expense,
}

/// Change notification published by a ledger store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    GroupCreated(GroupId),
    ExpenseAdded { group_id: GroupId, expense_id: ExpenseId },
    ExpensesSettled { group_id: GroupId, count: usize },
    ProposalUpdated { group_id: GroupId, signatures: usize },
    ProposalRemoved(GroupId),
}

impl LedgerEvent {
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::GroupCreated(id) | Self::ProposalRemoved(id) => *id,
            Self::ExpenseAdded { group_id, .. }
            | Self::ExpensesSettled { group_id, .. }
            | Self::ProposalUpdated { group_id, .. } => *group_id,
        }
    }
}

/// Document store holding groups, their expenses, and settle proposals.
///
/// Readers pull snapshots; `subscribe` lets them react to changes instead of
/// polling.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Register a new group.
    async fn create_group(&self, group: Group) -> Result<(), LedgerError>;

    /// Fetch a group by id.
    async fn get_group(&self, group_id: GroupId) -> Result<Group, LedgerError>;

    /// Validate and append an expense to a group.
    async fn add_expense(
        &self,
        group_id: GroupId,
        expense: Expense,
    ) -> Result<ExpenseId, LedgerError>;

    /// All expenses of a group, in insertion order.
    async fn list_expenses(&self, group_id: GroupId) -> Result<Vec<StoredExpense>, LedgerError>;

    /// Unsettled expenses of a group, in insertion order.
    async fn unsettled_expenses(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<StoredExpense>, LedgerError> {
        Ok(self
            .list_expenses(group_id)
            .await?
            .into_iter()
            .filter(|e| !e.expense.settled)
            .collect())
    }

    /// Flip `settled` on the given expenses; returns how many changed.
    ///
    /// Expenses already settled are left alone.
    async fn mark_settled(
        &self,
        group_id: GroupId,
        expense_ids: &[ExpenseId],
    ) -> Result<usize, LedgerError>;

    /// Every group `member` belongs to, oldest first.
    async fn groups_for_member(&self, member: Address) -> Result<Vec<Group>, LedgerError>;

    /// Store (create or replace) the active proposal of a group.
    async fn put_proposal(&self, proposal: SettleProposal) -> Result<(), LedgerError>;

    /// The group's active proposal, if any.
    async fn active_proposal(
        &self,
        group_id: GroupId,
    ) -> Result<Option<SettleProposal>, LedgerError>;

    /// Delete the active proposal; returns whether one existed.
    async fn remove_proposal(&self, group_id: GroupId) -> Result<bool, LedgerError>;

    /// Receive every subsequent change.
    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent>;
}
