use async_trait::async_trait;
use squary_core::{Address, Group, GroupId, ProposalSignature, TokenAmount, TokenDebt};

use crate::error::SettlementError;
use crate::types::{SettlementId, SettlementReceipt, SettlementStatus};

/// Settlement contract interface.
///
/// Each implementation bridges the group ledger to a concrete settlement
/// contract (an on-chain deployment, or the in-process internal contract).
#[async_trait]
pub trait SettlementContract: Send + Sync {
    /// Register a group's members and signature threshold with the contract.
    async fn register_group(&self, group: &Group) -> Result<(), SettlementError>;

    /// Whether `address` is a registered member of the group.
    async fn is_member(&self, group_id: GroupId, address: Address) -> Result<bool, SettlementError>;

    /// Ids of every registered group `member` belongs to.
    async fn user_groups(&self, member: Address) -> Result<Vec<GroupId>, SettlementError>;

    /// Current settlement nonce of the group. Action hashes are bound to it.
    async fn group_nonce(&self, group_id: GroupId) -> Result<u64, SettlementError>;

    /// Transfer every debt in one batch once enough member signatures are attached.
    async fn settle_debts_with_signatures(
        &self,
        group_id: GroupId,
        debts: &[TokenDebt],
        signatures: &[ProposalSignature],
    ) -> Result<SettlementReceipt, SettlementError>;

    /// Token balance a member holds inside the group.
    async fn balance_of(&self, group_id: GroupId, member: Address) -> Result<i128, SettlementError>;

    /// Credit a member's group balance with tokens moved into the contract.
    async fn deposit_funds(
        &self,
        group_id: GroupId,
        member: Address,
        amount: TokenAmount,
    ) -> Result<i128, SettlementError>;

    /// Move tokens out of the contract; fails if the member's balance is too low.
    async fn withdraw_funds(
        &self,
        group_id: GroupId,
        member: Address,
        amount: TokenAmount,
    ) -> Result<i128, SettlementError>;

    /// Query the status of a submitted settlement.
    async fn get_status(
        &self,
        settlement_id: SettlementId,
    ) -> Result<SettlementStatus, SettlementError>;

    /// Return the unique identifier of this contract (e.g. "sc-internal").
    fn contract_id(&self) -> &str;
}
