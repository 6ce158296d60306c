//! Transactional store contract for the ledger
//!
//! The ledger engine depends only on these traits, never on a concrete
//! driver. [`super::postgres::PgLedgerStore`] is the production backend,
//! [`super::memory::MemoryLedgerStore`] the in-process one.

use async_trait::async_trait;

use super::models::{Account, Entry, NewAccount, Page, Transfer};
use crate::db::StoreError;

/// Non-transactional reads and account creation
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a store transaction
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError>;

    async fn get_account(&self, id: i64) -> Result<Account, StoreError>;

    /// Accounts of one owner, ordered by id
    async fn list_accounts(&self, owner: &str, page: Page) -> Result<Vec<Account>, StoreError>;

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError>;

    /// Transfers where the account is either source or destination, ordered by id
    async fn list_transfers(&self, account_id: i64, page: Page)
    -> Result<Vec<Transfer>, StoreError>;

    /// Entries of one account, ordered by id
    async fn list_entries(&self, account_id: i64, page: Page) -> Result<Vec<Entry>, StoreError>;
}

/// One open store transaction
///
/// Dropping a transaction without calling [`LedgerTx::commit`] discards it.
#[async_trait]
pub trait LedgerTx: Send {
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError>;

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError>;

    /// Read a row and hold its lock until the transaction ends
    async fn get_account_for_update(&mut self, id: i64) -> Result<Account, StoreError>;

    /// Atomically add `delta` to the stored balance and return the updated row.
    /// Locks the row until the transaction ends.
    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
