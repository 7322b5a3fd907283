use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use squary_core::{Address, Group, GroupId, ProposalSignature, TokenAmount, TokenDebt};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::SettlementError;
use crate::traits::SettlementContract;
use crate::types::{SettlementId, SettlementReceipt, SettlementStatus};

/// An individual journal entry in the double-entry bookkeeping system.
#[derive(Debug, Clone)]
struct JournalEntry {
    group_id: GroupId,
    /// The member whose group balance is affected.
    member: Address,
    /// Positive = credit, negative = debit.
    delta: i128,
    /// Settlement that produced the entry; `None` for deposits and withdrawals.
    settlement_id: Option<SettlementId>,
}

/// Contract-side view of a registered group.
#[derive(Debug, Clone)]
struct RegisteredGroup {
    members: Vec<Address>,
    threshold: usize,
    nonce: u64,
}

/// In-process settlement contract.
///
/// Mirrors the on-chain contract's rules with an in-memory double-entry
/// journal: registered groups, per-member token balances, a per-group nonce
/// bumped by every settlement, and a signature threshold. Signatures are
/// counted per distinct member signer; their cryptographic validity is not
/// checked here.
pub struct InternalContract {
    groups: DashMap<GroupId, RegisteredGroup>,
    /// Signed balance per (group, member), in token units.
    balances: DashMap<(GroupId, Address), i128>,
    journal: DashMap<Uuid, JournalEntry>,
    receipts: DashMap<SettlementId, SettlementReceipt>,
}

impl InternalContract {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
            balances: DashMap::new(),
            journal: DashMap::new(),
            receipts: DashMap::new(),
        }
    }

    /// Get the current balance of a member, zero if never touched.
    pub fn get_balance(&self, group_id: GroupId, member: &Address) -> i128 {
        self.balances
            .get(&(group_id, *member))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Number of journal entries recorded for a group.
    pub fn journal_len(&self, group_id: GroupId) -> usize {
        self.journal
            .iter()
            .filter(|e| e.value().group_id == group_id)
            .count()
    }

    /// Journal deltas recorded for one member of a group.
    pub fn member_journal(&self, group_id: GroupId, member: &Address) -> Vec<i128> {
        self.journal
            .iter()
            .filter(|e| e.value().group_id == group_id && e.value().member == *member)
            .map(|e| e.value().delta)
            .collect()
    }

    /// Sum of all journal deltas for a group's settlements.
    pub fn settlement_net(&self, group_id: GroupId) -> i128 {
        self.journal
            .iter()
            .filter(|e| e.value().group_id == group_id && e.value().settlement_id.is_some())
            .map(|e| e.value().delta)
            .sum()
    }

    fn require_member(
        group: &RegisteredGroup,
        address: &Address,
    ) -> Result<(), SettlementError> {
        if group.members.contains(address) {
            Ok(())
        } else {
            Err(SettlementError::NotMember(*address))
        }
    }

    fn signed_units(amount: TokenAmount) -> Result<i128, SettlementError> {
        i128::try_from(amount.value())
            .map_err(|_| SettlementError::ContractRejected(format!("amount {amount} out of range")))
    }

    fn apply(
        &self,
        group_id: GroupId,
        member: Address,
        delta: i128,
        settlement_id: Option<SettlementId>,
    ) -> i128 {
        self.journal.insert(
            Uuid::now_v7(),
            JournalEntry {
                group_id,
                member,
                delta,
                settlement_id,
            },
        );
        let mut balance = self.balances.entry((group_id, member)).or_insert(0);
        *balance += delta;
        *balance
    }
}

impl Default for InternalContract {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettlementContract for InternalContract {
    async fn register_group(&self, group: &Group) -> Result<(), SettlementError> {
        group.validate()?;
        if self.groups.contains_key(&group.id) {
            return Err(SettlementError::GroupAlreadyRegistered(group.id));
        }
        self.groups.insert(
            group.id,
            RegisteredGroup {
                members: group.members.clone(),
                threshold: group.signature_threshold,
                nonce: 0,
            },
        );
        tracing::info!(
            group_id = %group.id,
            members = group.members.len(),
            threshold = group.signature_threshold,
            "Group registered with internal contract"
        );
        Ok(())
    }

    async fn is_member(&self, group_id: GroupId, address: Address) -> Result<bool, SettlementError> {
        let group = self
            .groups
            .get(&group_id)
            .ok_or(SettlementError::GroupNotRegistered(group_id))?;
        Ok(group.members.contains(&address))
    }

    async fn user_groups(&self, member: Address) -> Result<Vec<GroupId>, SettlementError> {
        let mut ids: Vec<GroupId> = self
            .groups
            .iter()
            .filter(|g| g.value().members.contains(&member))
            .map(|g| *g.key())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn group_nonce(&self, group_id: GroupId) -> Result<u64, SettlementError> {
        self.groups
            .get(&group_id)
            .map(|g| g.nonce)
            .ok_or(SettlementError::GroupNotRegistered(group_id))
    }

    async fn settle_debts_with_signatures(
        &self,
        group_id: GroupId,
        debts: &[TokenDebt],
        signatures: &[ProposalSignature],
    ) -> Result<SettlementReceipt, SettlementError> {
        // Holding the group entry serializes settlements per group.
        let mut group = self
            .groups
            .get_mut(&group_id)
            .ok_or(SettlementError::GroupNotRegistered(group_id))?;

        let mut signers = HashSet::new();
        for sig in signatures {
            Self::require_member(&group, &sig.signer)?;
            signers.insert(sig.signer);
        }
        if signers.len() < group.threshold {
            return Err(SettlementError::InsufficientSignatures {
                have: signers.len(),
                need: group.threshold,
            });
        }

        let mut total: u128 = 0;
        let mut transfers = Vec::with_capacity(debts.len());
        for debt in debts {
            Self::require_member(&group, &debt.debtor)?;
            Self::require_member(&group, &debt.creditor)?;
            total = total
                .checked_add(debt.amount.value())
                .ok_or_else(|| SettlementError::ContractRejected("total overflows".into()))?;
            transfers.push((debt.debtor, debt.creditor, Self::signed_units(debt.amount)?));
        }

        let settlement_id = SettlementId::new();
        for (debtor, creditor, value) in transfers {
            self.apply(group_id, debtor, -value, Some(settlement_id));
            self.apply(group_id, creditor, value, Some(settlement_id));
        }

        let nonce = group.nonce;
        group.nonce += 1;

        let receipt = SettlementReceipt {
            settlement_id,
            contract_id: self.contract_id().to_string(),
            group_id,
            status: SettlementStatus::Confirmed,
            nonce,
            debt_count: debts.len(),
            total: TokenAmount(total),
            confirmed_at: Utc::now(),
            tx_ref: Some(format!("internal-{}", settlement_id)),
        };
        self.receipts.insert(settlement_id, receipt.clone());

        tracing::info!(
            settlement_id = %settlement_id,
            group_id = %group_id,
            nonce,
            debts = debts.len(),
            total,
            "Internal settlement confirmed"
        );
        Ok(receipt)
    }

    async fn balance_of(&self, group_id: GroupId, member: Address) -> Result<i128, SettlementError> {
        let group = self
            .groups
            .get(&group_id)
            .ok_or(SettlementError::GroupNotRegistered(group_id))?;
        Self::require_member(&group, &member)?;
        Ok(self.get_balance(group_id, &member))
    }

    async fn deposit_funds(
        &self,
        group_id: GroupId,
        member: Address,
        amount: TokenAmount,
    ) -> Result<i128, SettlementError> {
        let group = self
            .groups
            .get(&group_id)
            .ok_or(SettlementError::GroupNotRegistered(group_id))?;
        Self::require_member(&group, &member)?;
        let value = Self::signed_units(amount)?;
        let balance = self.apply(group_id, member, value, None);
        tracing::info!(group_id = %group_id, member = %member, amount = %amount, "Funds deposited");
        Ok(balance)
    }

    async fn withdraw_funds(
        &self,
        group_id: GroupId,
        member: Address,
        amount: TokenAmount,
    ) -> Result<i128, SettlementError> {
        let group = self
            .groups
            .get(&group_id)
            .ok_or(SettlementError::GroupNotRegistered(group_id))?;
        Self::require_member(&group, &member)?;
        let value = Self::signed_units(amount)?;
        let available = self.get_balance(group_id, &member);
        if available < value {
            return Err(SettlementError::InsufficientBalance {
                available,
                required: amount.value(),
            });
        }
        let balance = self.apply(group_id, member, -value, None);
        tracing::info!(group_id = %group_id, member = %member, amount = %amount, "Funds withdrawn");
        Ok(balance)
    }

    async fn get_status(
        &self,
        settlement_id: SettlementId,
    ) -> Result<SettlementStatus, SettlementError> {
        let receipt = self
            .receipts
            .get(&settlement_id)
            .ok_or(SettlementError::NotFound(settlement_id))?;
        Ok(receipt.status)
    }

    fn contract_id(&self) -> &str {
        "sc-internal"
    }
}
