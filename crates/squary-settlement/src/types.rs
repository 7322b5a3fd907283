use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use squary_core::{GroupId, TokenAmount};
use uuid::Uuid;

/// Unique identifier for a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementId(pub Uuid);

impl SettlementId {
    /// Create a new random settlement ID (UUID v7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SettlementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SettlementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle status of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// Submitted to the contract and awaiting confirmation.
    Pending,
    /// Confirmed by the contract.
    Confirmed,
    /// Rejected by the contract (non-recoverable).
    Failed,
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Proof that a batch of debts was settled by the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub settlement_id: SettlementId,
    /// Contract that executed the settlement.
    pub contract_id: String,
    pub group_id: GroupId,
    /// Final status (should be Confirmed).
    pub status: SettlementStatus,
    /// Group nonce consumed by this settlement.
    pub nonce: u64,
    pub debt_count: usize,
    /// Sum of all settled debt amounts.
    pub total: TokenAmount,
    pub confirmed_at: DateTime<Utc>,
    /// Transaction reference on the underlying rail.
    pub tx_ref: Option<String>,
}
