//! Squary settlement layer.
//!
//! Turns a group's simplified debts into a signed settle proposal, collects
//! member signatures up to the group threshold, and executes the batch
//! against a settlement contract. Confirmed settlements are written back to
//! the ledger store.

pub mod error;
pub mod types;
pub mod config;
pub mod action_hash;
pub mod traits;
pub mod manager;
pub mod adapters;

pub use error::SettlementError;
pub use types::{SettlementId, SettlementReceipt, SettlementStatus};
pub use config::{ContractConfig, LoggingConfig, NetworkConfig, SettlementConfig, TokenConfig};
pub use action_hash::{eth_signed_message_hash, settle_action_hash, SETTLE_ACTION};
pub use traits::SettlementContract;
pub use manager::{
    ProposalOutcome, SettlementManager, SettlementPlan, DEFAULT_WRITE_BACK_TIMEOUT,
};
pub use adapters::InternalContract;
