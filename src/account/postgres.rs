//! PostgreSQL ledger backend

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{Account, Entry, NewAccount, Page, Transfer};
use super::repository::{LedgerStore, LedgerTx};
use crate::db::StoreError;

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";
const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";

/// Ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bound how long a transaction waits on a row lock before the server
    /// cancels the statement
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if let Some(timeout) = self.lock_timeout {
            // SET does not take bind parameters
            let sql = format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis().max(1));
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (owner, balance, currency) VALUES ($1, $2, $3) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(&account.owner)
            .bind(account.balance)
            .bind(&account.currency)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_accounts(&self, owner: &str, page: Page) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE owner = $1 ORDER BY id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, Account>(&sql)
            .bind(owner)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        let sql = format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1");
        let row = sqlx::query_as::<_, Transfer>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_transfers(
        &self,
        account_id: i64,
        page: Page,
    ) -> Result<Vec<Transfer>, StoreError> {
        let sql = format!(
            r#"SELECT {TRANSFER_COLUMNS} FROM transfers
               WHERE from_account_id = $1 OR to_account_id = $1
               ORDER BY id LIMIT $2 OFFSET $3"#
        );
        let rows = sqlx::query_as::<_, Transfer>(&sql)
            .bind(account_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_entries(&self, account_id: i64, page: Page) -> Result<Vec<Entry>, StoreError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE account_id = $1 ORDER BY id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, Entry>(&sql)
            .bind(account_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// Open PostgreSQL transaction. Dropped without commit means rolled back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        let sql = format!(
            "INSERT INTO transfers (from_account_id, to_account_id, amount) VALUES ($1, $2, $3) RETURNING {TRANSFER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Transfer>(&sql)
            .bind(from_account_id)
            .bind(to_account_id)
            .bind(amount)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError> {
        let sql = format!(
            "INSERT INTO entries (account_id, amount) VALUES ($1, $2) RETURNING {ENTRY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Entry>(&sql)
            .bind(account_id)
            .bind(amount)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn get_account_for_update(&mut self, id: i64) -> Result<Account, StoreError> {
        // NO KEY UPDATE: does not conflict with the KEY SHARE locks that the
        // entries/transfers foreign keys take on the same rows.
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR NO KEY UPDATE");
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        let sql = format!(
            "UPDATE accounts SET balance = balance + $1 WHERE id = $2 RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(delta)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgLedgerTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let PgLedgerTx { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
