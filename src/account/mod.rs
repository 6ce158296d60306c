//! Account, entry and transfer storage
//!
//! Rows are owned by the backing store; nothing here caches them across calls.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

// Re-export commonly used types
pub use memory::MemoryLedgerStore;
pub use models::{Account, Entry, NewAccount, Page, Transfer, TransferResult};
pub use postgres::PgLedgerStore;
pub use repository::{LedgerStore, LedgerTx};
