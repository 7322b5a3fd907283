use async_trait::async_trait;
use dashmap::DashMap;
use squary_core::{Address, Expense, ExpenseId, Group, GroupId, SettleProposal};
use tokio::sync::broadcast;

use crate::error::LedgerError;
use crate::traits::{LedgerEvent, LedgerStore, StoredExpense};

/// Capacity of the change-notification channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// In-memory ledger store.
///
/// Thread-safe: uses `DashMap` for concurrent access. Useful for tests and
/// for one-shot settlements that never outlive the process.
pub struct MemoryLedger {
    groups: DashMap<GroupId, Group>,
    expenses: DashMap<GroupId, Vec<StoredExpense>>,
    proposals: DashMap<GroupId, SettleProposal>,
    events: broadcast::Sender<LedgerEvent>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            groups: DashMap::new(),
            expenses: DashMap::new(),
            proposals: DashMap::new(),
            events,
        }
    }

    fn publish(&self, event: LedgerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn require_group(&self, group_id: GroupId) -> Result<Group, LedgerError> {
        self.groups
            .get(&group_id)
            .map(|g| g.value().clone())
            .ok_or(LedgerError::GroupNotFound(group_id))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_group(&self, group: Group) -> Result<(), LedgerError> {
        group.validate()?;
        let id = group.id;
        if self.groups.contains_key(&id) {
            return Err(LedgerError::GroupExists(id));
        }
        self.groups.insert(id, group);
        self.expenses.insert(id, Vec::new());
        tracing::info!(group_id = %id, "group created");
        self.publish(LedgerEvent::GroupCreated(id));
        Ok(())
    }

    async fn get_group(&self, group_id: GroupId) -> Result<Group, LedgerError> {
        self.require_group(group_id)
    }

    async fn add_expense(
        &self,
        group_id: GroupId,
        expense: Expense,
    ) -> Result<ExpenseId, LedgerError> {
        let group = self.require_group(group_id)?;
        group.validate_expense(&expense)?;

        let id = ExpenseId::new();
        self.expenses.entry(group_id).or_default().push(StoredExpense {
            id,
            group_id,
            expense,
        });
        tracing::debug!(group_id = %group_id, expense_id = %id, "expense added");
        self.publish(LedgerEvent::ExpenseAdded {
            group_id,
            expense_id: id,
        });
        Ok(id)
    }

    async fn list_expenses(&self, group_id: GroupId) -> Result<Vec<StoredExpense>, LedgerError> {
        self.require_group(group_id)?;
        Ok(self
            .expenses
            .get(&group_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn mark_settled(
        &self,
        group_id: GroupId,
        expense_ids: &[ExpenseId],
    ) -> Result<usize, LedgerError> {
        self.require_group(group_id)?;
        let mut entry = self.expenses.entry(group_id).or_default();

        if let Some(missing) = expense_ids
            .iter()
            .find(|id| !entry.iter().any(|e| e.id == **id))
        {
            return Err(LedgerError::ExpenseNotFound(*missing));
        }

        let mut count = 0;
        for stored in entry.iter_mut() {
            if !stored.expense.settled && expense_ids.contains(&stored.id) {
                stored.expense.settled = true;
                count += 1;
            }
        }
        drop(entry);

        tracing::info!(group_id = %group_id, count, "expenses marked settled");
        self.publish(LedgerEvent::ExpensesSettled { group_id, count });
        Ok(count)
    }

    async fn groups_for_member(&self, member: Address) -> Result<Vec<Group>, LedgerError> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|g| g.value().is_member(&member))
            .map(|g| g.value().clone())
            .collect();
        // Group ids are time-ordered.
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn put_proposal(&self, proposal: SettleProposal) -> Result<(), LedgerError> {
        let group_id = proposal.group_id;
        self.require_group(group_id)?;
        let signatures = proposal.signature_count();
        self.proposals.insert(group_id, proposal);
        self.publish(LedgerEvent::ProposalUpdated {
            group_id,
            signatures,
        });
        Ok(())
    }

    async fn active_proposal(
        &self,
        group_id: GroupId,
    ) -> Result<Option<SettleProposal>, LedgerError> {
        self.require_group(group_id)?;
        Ok(self.proposals.get(&group_id).map(|p| p.value().clone()))
    }

    async fn remove_proposal(&self, group_id: GroupId) -> Result<bool, LedgerError> {
        let removed = self.proposals.remove(&group_id).is_some();
        if removed {
            self.publish(LedgerEvent::ProposalRemoved(group_id));
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }
}
