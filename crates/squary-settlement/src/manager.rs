use backoff::future::retry;
use backoff::ExponentialBackoff;
use dashmap::DashMap;
use serde::Serialize;
use squary_core::{
    compute_balances, simplify_debts, to_token_debts, to_token_units, validate_all, Address,
    Balances, Debt, Expense, ExpenseId, GroupId, Money, SettleProposal, TokenDebt,
};
use squary_ledger::{LedgerError, LedgerStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::action_hash::settle_action_hash;
use crate::config::SettlementConfig;
use crate::error::SettlementError;
use crate::traits::SettlementContract;
use crate::types::SettlementReceipt;

/// Snapshot of what a settlement would transfer right now.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementPlan {
    pub group_id: GroupId,
    /// Simplified debts in decimal money.
    pub debts: Vec<Debt>,
    /// The same debts in token units; zero-unit debts are dropped.
    pub token_debts: Vec<TokenDebt>,
    /// Unsettled expenses the plan was computed from.
    pub expense_ids: Vec<ExpenseId>,
    /// Contract nonce the action hash is bound to.
    pub nonce: u64,
    pub action_hash: [u8; 32],
}

impl SettlementPlan {
    pub fn action_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.action_hash))
    }
}

/// Result of adding a signature to a group's proposal.
#[derive(Debug, Clone)]
pub enum ProposalOutcome {
    /// Still collecting signatures.
    Pending(SettleProposal),
    /// Threshold reached; the contract settled the debts.
    Settled(SettlementReceipt),
}

/// How long a confirmed settlement keeps retrying its ledger write-back.
pub const DEFAULT_WRITE_BACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Drives the settle flow for groups: simplify, propose, collect
/// signatures, execute against the contract, then write back to the ledger.
pub struct SettlementManager {
    ledger: Arc<dyn LedgerStore>,
    contract: Arc<dyn SettlementContract>,
    config: SettlementConfig,
    /// Serializes proposal updates per group.
    locks: DashMap<GroupId, Arc<Mutex<()>>>,
    write_back_timeout: Duration,
}

impl SettlementManager {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        contract: Arc<dyn SettlementContract>,
        config: SettlementConfig,
    ) -> Self {
        tracing::info!(
            contract_id = %contract.contract_id(),
            network = %config.network.name,
            token = %config.token.symbol,
            "Settlement manager ready"
        );
        Self {
            ledger,
            contract,
            config,
            locks: DashMap::new(),
            write_back_timeout: DEFAULT_WRITE_BACK_TIMEOUT,
        }
    }

    /// Bound the retries of the post-settlement ledger write-back.
    pub fn with_write_back_timeout(mut self, timeout: Duration) -> Self {
        self.write_back_timeout = timeout;
        self
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    pub fn contract(&self) -> &Arc<dyn SettlementContract> {
        &self.contract
    }

    fn group_lock(&self, group_id: GroupId) -> Arc<Mutex<()>> {
        self.locks
            .entry(group_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create the group in the ledger and register it with the contract.
    pub async fn register_group(&self, group: squary_core::Group) -> Result<(), SettlementError> {
        self.ledger.create_group(group.clone()).await?;
        self.contract.register_group(&group).await
    }

    /// Net balance of every member over the group's unsettled expenses.
    pub async fn balances(&self, group_id: GroupId) -> Result<Balances, SettlementError> {
        let expenses = self.unsettled(group_id).await?;
        Ok(compute_balances(&expenses.1)?)
    }

    async fn unsettled(
        &self,
        group_id: GroupId,
    ) -> Result<(Vec<ExpenseId>, Vec<Expense>), SettlementError> {
        let stored = self.ledger.unsettled_expenses(group_id).await?;
        Ok(stored.into_iter().map(|s| (s.id, s.expense)).unzip())
    }

    /// Compute the debts, token amounts, and action hash for the group's
    /// unsettled expenses.
    pub async fn prepare(&self, group_id: GroupId) -> Result<SettlementPlan, SettlementError> {
        let group = self.ledger.get_group(group_id).await?;
        let (expense_ids, expenses) = self.unsettled(group_id).await?;
        validate_all(&expenses)?;
        for expense in &expenses {
            group.validate_expense(expense)?;
        }

        let debts = simplify_debts(&expenses)?;
        let token_debts = to_token_debts(&debts, self.config.token.decimals)?;
        if token_debts.is_empty() {
            return Err(SettlementError::NothingToSettle(group_id));
        }

        let nonce = self.contract.group_nonce(group_id).await?;
        let action_hash = settle_action_hash(&group_id, &token_debts, nonce);

        tracing::debug!(
            group_id = %group_id,
            expenses = expense_ids.len(),
            debts = token_debts.len(),
            nonce,
            "Settlement plan prepared"
        );

        Ok(SettlementPlan {
            group_id,
            debts,
            token_debts,
            expense_ids,
            nonce,
            action_hash,
        })
    }

    /// Open a settle proposal carrying the proposer's signature over the
    /// plan's action hash.
    ///
    /// Settles immediately when the group's threshold is one.
    pub async fn propose(
        &self,
        group_id: GroupId,
        proposer: Address,
        signature: Vec<u8>,
    ) -> Result<ProposalOutcome, SettlementError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().await;

        if self.ledger.active_proposal(group_id).await?.is_some() {
            return Err(SettlementError::ProposalExists(group_id));
        }

        let group = self.ledger.get_group(group_id).await?;
        let plan = self.prepare(group_id).await?;
        let proposal = SettleProposal::new(
            &group,
            plan.token_debts,
            plan.expense_ids,
            plan.nonce,
            plan.action_hash,
            proposer,
            signature,
        )?;

        tracing::info!(
            group_id = %group_id,
            proposer = %proposer,
            action_hash = %proposal.action_hash_hex(),
            "Settle proposal created"
        );

        let ready = proposal.is_ready(group.signature_threshold);
        self.ledger.put_proposal(proposal.clone()).await?;
        if ready {
            return self.execute_locked(group_id).await.map(ProposalOutcome::Settled);
        }
        Ok(ProposalOutcome::Pending(proposal))
    }

    /// Add a member's signature to the active proposal, executing it once
    /// the group's signature threshold is reached.
    pub async fn sign(
        &self,
        group_id: GroupId,
        signer: Address,
        signature: Vec<u8>,
    ) -> Result<ProposalOutcome, SettlementError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().await;

        let mut proposal = self
            .ledger
            .active_proposal(group_id)
            .await?
            .ok_or(SettlementError::NoActiveProposal(group_id))?;
        let group = self.ledger.get_group(group_id).await?;

        let count = proposal.add_signature(&group, signer, signature)?;
        self.ledger.put_proposal(proposal.clone()).await?;
        tracing::info!(
            group_id = %group_id,
            signer = %signer,
            signatures = count,
            threshold = group.signature_threshold,
            "Settle proposal signed"
        );

        if proposal.is_ready(group.signature_threshold) {
            return self.execute_locked(group_id).await.map(ProposalOutcome::Settled);
        }
        Ok(ProposalOutcome::Pending(proposal))
    }

    /// Submit the active proposal to the contract.
    pub async fn execute(&self, group_id: GroupId) -> Result<SettlementReceipt, SettlementError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().await;
        self.execute_locked(group_id).await
    }

    async fn execute_locked(&self, group_id: GroupId) -> Result<SettlementReceipt, SettlementError> {
        let proposal = self
            .ledger
            .active_proposal(group_id)
            .await?
            .ok_or(SettlementError::NoActiveProposal(group_id))?;
        let group = self.ledger.get_group(group_id).await?;

        if !proposal.is_ready(group.signature_threshold) {
            return Err(SettlementError::InsufficientSignatures {
                have: proposal.signature_count(),
                need: group.signature_threshold,
            });
        }

        let contract_nonce = self.contract.group_nonce(group_id).await?;
        if contract_nonce != proposal.nonce {
            tracing::warn!(
                group_id = %group_id,
                proposal_nonce = proposal.nonce,
                contract_nonce,
                "Settle proposal is stale"
            );
            return Err(SettlementError::StaleProposal {
                proposal: proposal.nonce,
                contract: contract_nonce,
            });
        }

        let receipt = match self
            .contract
            .settle_debts_with_signatures(group_id, &proposal.debts, &proposal.signatures)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                // The proposal stays active so members can retry or cancel.
                tracing::error!(group_id = %group_id, error = %e, "Settlement failed");
                return Err(e);
            }
        };

        // The contract has moved on; from here the receipt is never dropped.
        let expense_ids = proposal.expense_ids;
        let settled = match self.write_back(group_id, &expense_ids).await {
            Ok(settled) => settled,
            Err(source) => {
                tracing::error!(
                    group_id = %group_id,
                    settlement_id = %receipt.settlement_id,
                    error = %source,
                    "Settled on-chain but ledger write-back failed"
                );
                return Err(SettlementError::WriteBackFailed {
                    receipt: Box::new(receipt),
                    expense_ids,
                    source,
                });
            }
        };

        tracing::info!(
            group_id = %group_id,
            settlement_id = %receipt.settlement_id,
            nonce = receipt.nonce,
            debts = receipt.debt_count,
            expenses_settled = settled,
            "Settlement confirmed"
        );
        Ok(receipt)
    }

    /// Record a settlement the contract already confirmed: mark its expenses
    /// settled and clear the proposal. Used to recover from
    /// [`SettlementError::WriteBackFailed`].
    pub async fn complete_write_back(
        &self,
        group_id: GroupId,
        expense_ids: &[ExpenseId],
    ) -> Result<usize, SettlementError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().await;
        let settled = self.write_back(group_id, expense_ids).await?;
        tracing::info!(group_id = %group_id, expenses_settled = settled, "Ledger write-back completed");
        Ok(settled)
    }

    async fn write_back(
        &self,
        group_id: GroupId,
        expense_ids: &[ExpenseId],
    ) -> Result<usize, LedgerError> {
        let ledger = &self.ledger;
        let settled = retry(self.write_back_policy(), move || async move {
            ledger
                .mark_settled(group_id, expense_ids)
                .await
                .map_err(|e| retry_class(group_id, e))
        })
        .await?;
        retry(self.write_back_policy(), move || async move {
            ledger
                .remove_proposal(group_id)
                .await
                .map_err(|e| retry_class(group_id, e))
        })
        .await?;
        Ok(settled)
    }

    fn write_back_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: Duration::from_millis(50),
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: Some(self.write_back_timeout),
            ..Default::default()
        }
    }

    /// Drop the group's active proposal; returns whether one existed.
    pub async fn cancel(&self, group_id: GroupId) -> Result<bool, SettlementError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().await;
        let removed = self.ledger.remove_proposal(group_id).await?;
        if removed {
            tracing::info!(group_id = %group_id, "Settle proposal cancelled");
        }
        Ok(removed)
    }

    /// Deposit a decimal amount of the configured token into the group.
    pub async fn deposit(
        &self,
        group_id: GroupId,
        member: Address,
        amount: Money,
    ) -> Result<i128, SettlementError> {
        let units = self.positive_units(amount)?;
        self.contract.deposit_funds(group_id, member, units).await
    }

    /// Withdraw a decimal amount of the configured token from the group.
    pub async fn withdraw(
        &self,
        group_id: GroupId,
        member: Address,
        amount: Money,
    ) -> Result<i128, SettlementError> {
        let units = self.positive_units(amount)?;
        self.contract.withdraw_funds(group_id, member, units).await
    }

    fn positive_units(&self, amount: Money) -> Result<squary_core::TokenAmount, SettlementError> {
        if !amount.is_positive() {
            return Err(squary_core::CoreError::InvalidAmount(format!(
                "amount must be positive, got {amount}"
            ))
            .into());
        }
        Ok(to_token_units(amount, self.config.token.decimals)?)
    }
}

/// Storage faults are worth retrying; missing records are not.
fn retry_class(group_id: GroupId, e: LedgerError) -> backoff::Error<LedgerError> {
    match e {
        LedgerError::Storage(_) => {
            tracing::warn!(group_id = %group_id, error = %e, "Ledger write-back failed, retrying");
            backoff::Error::transient(e)
        }
        other => backoff::Error::permanent(other),
    }
}
