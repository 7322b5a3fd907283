use squary_core::{Address, CoreError, ExpenseId, GroupId};
use squary_ledger::LedgerError;

use crate::types::{SettlementId, SettlementReceipt};

/// Settlement-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("settlement not found: {0}")]
    NotFound(SettlementId),

    #[error("group not registered with contract: {0}")]
    GroupNotRegistered(GroupId),

    #[error("group already registered with contract: {0}")]
    GroupAlreadyRegistered(GroupId),

    #[error("{0} is not a member of the group")]
    NotMember(Address),

    #[error("group {0} already has an active settle proposal")]
    ProposalExists(GroupId),

    #[error("group {0} has no active settle proposal")]
    NoActiveProposal(GroupId),

    #[error("proposal nonce {proposal} does not match contract nonce {contract}")]
    StaleProposal { proposal: u64, contract: u64 },

    #[error("insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: usize },

    #[error("group {0} has nothing to settle")]
    NothingToSettle(GroupId),

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i128, required: u128 },

    /// The contract confirmed the settlement but the ledger could not record
    /// it. The expenses must be marked settled before the group settles again.
    #[error(
        "settlement {} confirmed on-chain but ledger write-back failed: {source}",
        .receipt.settlement_id
    )]
    WriteBackFailed {
        receipt: Box<SettlementReceipt>,
        expense_ids: Vec<ExpenseId>,
        source: LedgerError,
    },

    #[error("contract rejected settlement: {0}")]
    ContractRejected(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for SettlementError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for SettlementError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::io::Error> for SettlementError {
    fn from(e: std::io::Error) -> Self {
        Self::Config(e.to_string())
    }
}
