//! Squary ledger store.
//!
//! The document store holding group membership, per-group expense records,
//! and the active settle proposal of each group. The settlement flow pulls
//! snapshots from it and writes back the `settled` flags once a settlement is
//! confirmed.

pub mod error;
pub mod traits;
pub mod memory;
pub mod rocks;

pub use error::LedgerError;
pub use traits::{LedgerEvent, LedgerStore, StoredExpense};
pub use memory::MemoryLedger;
pub use rocks::RocksLedger;
