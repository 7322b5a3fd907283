//! RocksDB-backed ledger store.

use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use squary_core::{Address, Expense, ExpenseId, Group, GroupId, SettleProposal};
use std::path::Path;
use tokio::sync::broadcast;

use crate::error::LedgerError;
use crate::memory::EVENT_CHANNEL_CAPACITY;
use crate::traits::{LedgerEvent, LedgerStore, StoredExpense};

/// Column family names for different record types.
const CF_GROUPS: &str = "groups";
const CF_EXPENSES: &str = "expenses";
const CF_PROPOSALS: &str = "proposals";

/// Persistent ledger store.
///
/// Records are JSON-encoded. Expense keys are `group id ‖ expense id`; expense
/// ids are UUID v7, so a prefix scan returns a group's expenses in insertion
/// order.
pub struct RocksLedger {
    db: DB,
    events: broadcast::Sender<LedgerEvent>,
}

impl RocksLedger {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(path).map_err(|e| LedgerError::Storage(e.to_string()))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_GROUPS, Options::default()),
            ColumnFamilyDescriptor::new(CF_EXPENSES, Options::default()),
            ColumnFamilyDescriptor::new(CF_PROPOSALS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tracing::info!(path = %path.display(), "ledger storage opened");

        Ok(Self { db, events })
    }

    fn cf(&self, cf_name: &str) -> Result<&ColumnFamily, LedgerError> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| LedgerError::Storage(format!("column family '{cf_name}' not found")))
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<(), LedgerError> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>, LedgerError> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, cf_name: &str, key: &[u8]) -> Result<(), LedgerError> {
        let cf = self.cf(cf_name)?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    fn expense_key(group_id: &GroupId, expense_id: &ExpenseId) -> Vec<u8> {
        let mut key = Vec::with_capacity(48);
        key.extend_from_slice(group_id.as_bytes());
        key.extend_from_slice(expense_id.as_uuid().as_bytes());
        key
    }

    fn require_group(&self, group_id: GroupId) -> Result<Group, LedgerError> {
        self.get(CF_GROUPS, group_id.as_bytes())?
            .ok_or(LedgerError::GroupNotFound(group_id))
    }

    fn scan_expenses(&self, group_id: &GroupId) -> Result<Vec<StoredExpense>, LedgerError> {
        let cf = self.cf(CF_EXPENSES)?;
        let prefix: &[u8] = group_id.as_bytes();
        let mut expenses = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            expenses.push(serde_json::from_slice(&value)?);
        }
        Ok(expenses)
    }

    fn publish(&self, event: LedgerEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl LedgerStore for RocksLedger {
    async fn create_group(&self, group: Group) -> Result<(), LedgerError> {
        group.validate()?;
        let id = group.id;
        if self.get::<Group>(CF_GROUPS, id.as_bytes())?.is_some() {
            return Err(LedgerError::GroupExists(id));
        }
        self.put(CF_GROUPS, id.as_bytes(), &group)?;
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
        let stored = StoredExpense {
            id,
            group_id,
            expense,
        };
        self.put(CF_EXPENSES, &Self::expense_key(&group_id, &id), &stored)?;
        tracing::debug!(group_id = %group_id, expense_id = %id, "expense added");
        self.publish(LedgerEvent::ExpenseAdded {
            group_id,
            expense_id: id,
        });
        Ok(id)
    }

    async fn list_expenses(&self, group_id: GroupId) -> Result<Vec<StoredExpense>, LedgerError> {
        self.require_group(group_id)?;
        self.scan_expenses(&group_id)
    }

    async fn mark_settled(
        &self,
        group_id: GroupId,
        expense_ids: &[ExpenseId],
    ) -> Result<usize, LedgerError> {
        self.require_group(group_id)?;

        let mut pending = Vec::with_capacity(expense_ids.len());
        for id in expense_ids {
            let key = Self::expense_key(&group_id, id);
            let stored: StoredExpense = self
                .get(CF_EXPENSES, &key)?
                .ok_or(LedgerError::ExpenseNotFound(*id))?;
            pending.push((key, stored));
        }

        // One batch, so a failed write leaves every expense untouched.
        let cf = self.cf(CF_EXPENSES)?;
        let mut batch = WriteBatch::default();
        let mut count = 0;
        for (key, mut stored) in pending {
            if stored.expense.settled {
                continue;
            }
            stored.expense.settled = true;
            batch.put_cf(cf, &key, serde_json::to_vec(&stored)?);
            count += 1;
        }
        self.db.write(batch)?;

        tracing::info!(group_id = %group_id, count, "expenses marked settled");
        self.publish(LedgerEvent::ExpensesSettled { group_id, count });
        Ok(count)
    }

    async fn groups_for_member(&self, member: Address) -> Result<Vec<Group>, LedgerError> {
        let cf = self.cf(CF_GROUPS)?;
        let mut groups = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let group: Group = serde_json::from_slice(&value)?;
            if group.is_member(&member) {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    async fn put_proposal(&self, proposal: SettleProposal) -> Result<(), LedgerError> {
        let group_id = proposal.group_id;
        self.require_group(group_id)?;
        self.put(CF_PROPOSALS, group_id.as_bytes(), &proposal)?;
        self.publish(LedgerEvent::ProposalUpdated {
            group_id,
            signatures: proposal.signature_count(),
        });
        Ok(())
    }

    async fn active_proposal(
        &self,
        group_id: GroupId,
    ) -> Result<Option<SettleProposal>, LedgerError> {
        self.require_group(group_id)?;
        self.get(CF_PROPOSALS, group_id.as_bytes())
    }

    async fn remove_proposal(&self, group_id: GroupId) -> Result<bool, LedgerError> {
        let existed = self
            .get::<SettleProposal>(CF_PROPOSALS, group_id.as_bytes())?
            .is_some();
        if existed {
            self.delete(CF_PROPOSALS, group_id.as_bytes())?;
            self.publish(LedgerEvent::ProposalRemoved(group_id));
        }
        Ok(existed)
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squary_core::{Address, Money};
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("squary-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn group() -> Group {
        Group::new(GroupId::new(), "House", vec![addr(1), addr(2)], 1, addr(9)).unwrap()
    }

    #[tokio::test]
    async fn test_open_storage() {
        let dir = temp_dir();
        assert!(RocksLedger::open(&dir).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_expenses_scoped_to_group() {
        let dir = temp_dir();
        let ledger = RocksLedger::open(&dir).unwrap();

        let a = group();
        let b = group();
        ledger.create_group(a.clone()).await.unwrap();
        ledger.create_group(b.clone()).await.unwrap();

        let rent = Expense::new(Money::from_i64(800), "Rent", addr(1), vec![addr(2)]).unwrap();
        let power = Expense::new(Money::from_i64(60), "Power", addr(2), vec![addr(1)]).unwrap();
        let id1 = ledger.add_expense(a.id, rent).await.unwrap();
        let id2 = ledger.add_expense(a.id, power.clone()).await.unwrap();
        ledger.add_expense(b.id, power).await.unwrap();

        let listed: Vec<_> = ledger
            .list_expenses(a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(listed, vec![id1, id2]);
        assert_eq!(ledger.list_expenses(b.id).await.unwrap().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_mark_settled_persists() {
        let dir = temp_dir();
        let g = group();
        let id = {
            let ledger = RocksLedger::open(&dir).unwrap();
            ledger.create_group(g.clone()).await.unwrap();
            let e = Expense::new(Money::from_i64(10), "Milk", addr(1), vec![addr(2)]).unwrap();
            let id = ledger.add_expense(g.id, e).await.unwrap();
            assert_eq!(ledger.mark_settled(g.id, &[id]).await.unwrap(), 1);
            id
        };

        let reopened = RocksLedger::open(&dir).unwrap();
        let expenses = reopened.list_expenses(g.id).await.unwrap();
        assert_eq!(expenses[0].id, id);
        assert!(expenses[0].expense.settled);
        assert_eq!(reopened.mark_settled(g.id, &[id]).await.unwrap(), 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_mark_settled_is_all_or_nothing() {
        let dir = temp_dir();
        let ledger = RocksLedger::open(&dir).unwrap();
        let g = group();
        ledger.create_group(g.clone()).await.unwrap();
        let milk = Expense::new(Money::from_i64(10), "Milk", addr(1), vec![addr(2)]).unwrap();
        let bread = Expense::new(Money::from_i64(4), "Bread", addr(2), vec![addr(1)]).unwrap();
        let a = ledger.add_expense(g.id, milk).await.unwrap();
        let b = ledger.add_expense(g.id, bread).await.unwrap();

        let missing = ExpenseId::new();
        let result = ledger.mark_settled(g.id, &[a, missing]).await;
        assert!(matches!(result, Err(LedgerError::ExpenseNotFound(id)) if id == missing));
        assert_eq!(ledger.unsettled_expenses(g.id).await.unwrap().len(), 2);

        assert_eq!(ledger.mark_settled(g.id, &[a, b]).await.unwrap(), 2);
        assert!(ledger.unsettled_expenses(g.id).await.unwrap().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_groups_for_member_survives_reopen() {
        let dir = temp_dir();
        let house = Group::new(GroupId::from_bytes([1; 32]), "House", vec![addr(1), addr(2)], 1, addr(9)).unwrap();
        let trip = Group::new(GroupId::from_bytes([2; 32]), "Trip", vec![addr(2), addr(3)], 2, addr(9)).unwrap();
        {
            let ledger = RocksLedger::open(&dir).unwrap();
            ledger.create_group(house.clone()).await.unwrap();
            ledger.create_group(trip.clone()).await.unwrap();
        }

        let reopened = RocksLedger::open(&dir).unwrap();
        let ids = |groups: Vec<Group>| groups.into_iter().map(|g| g.id).collect::<Vec<_>>();
        assert_eq!(ids(reopened.groups_for_member(addr(2)).await.unwrap()), vec![house.id, trip.id]);
        assert_eq!(ids(reopened.groups_for_member(addr(1)).await.unwrap()), vec![house.id]);
        assert!(reopened.groups_for_member(addr(7)).await.unwrap().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_group() {
        let dir = temp_dir();
        let ledger = RocksLedger::open(&dir).unwrap();
        let result = ledger.get_group(GroupId::new()).await;
        assert!(matches!(result, Err(LedgerError::GroupNotFound(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_proposal_roundtrip() {
        let dir = temp_dir();
        let ledger = RocksLedger::open(&dir).unwrap();
        let g = group();
        ledger.create_group(g.clone()).await.unwrap();

        let p = SettleProposal::new(&g, vec![], vec![], 3, [1u8; 32], addr(2), vec![4, 2]).unwrap();
        ledger.put_proposal(p.clone()).await.unwrap();
        assert_eq!(ledger.active_proposal(g.id).await.unwrap(), Some(p));
        assert!(ledger.remove_proposal(g.id).await.unwrap());
        assert_eq!(ledger.active_proposal(g.id).await.unwrap(), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
