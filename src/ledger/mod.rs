//! Ledger Engine
//!
//! Moves funds between two accounts as one store transaction:
//!
//! ```text
//! create transfer → create two entries → lock rows (lower id first) → apply deltas → commit
//! ```
//!
//! Any failing step rolls the whole transaction back; there is no partial
//! outcome. Mutual exclusion on balances is delegated to the store's row
//! locks, the fixed lower-id-first order rules out circular waits between
//! transfers touching the same pair of accounts.

pub mod engine;

pub use engine::{LedgerEngine, SUPPORTED_CURRENCIES, TransferRequest};
