use squary_core::{CoreError, ExpenseId, GroupId};

/// Ledger-store errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("group already exists: {0}")]
    GroupExists(GroupId),

    #[error("expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
