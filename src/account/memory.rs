//! In-process ledger backend
//!
//! Mirrors the PostgreSQL semantics the ledger relies on: writes inside a
//! transaction are invisible until commit, balance updates take a per-row
//! lock that is held until commit or rollback, and a dropped transaction is
//! discarded. Used by tests and local runs without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Barrier, OwnedMutexGuard};

use super::models::{Account, Entry, NewAccount, Page, Transfer};
use super::repository::{LedgerStore, LedgerTx};
use crate::db::StoreError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply_delta(id: i64, balance: i64, delta: i64) -> Result<i64, StoreError> {
    balance
        .checked_add(delta)
        .ok_or_else(|| StoreError::Backend(format!("balance of account {id} out of range")))
}

/// Transactions meet here after taking their first row lock
struct Rendezvous {
    barrier: Arc<Barrier>,
    grace: Duration,
}

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    next_account_id: i64,
    next_entry_id: i64,
    next_transfer_id: i64,
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    /// Account id whose balance updates fail; 0 disables
    fail_balance_update: AtomicI64,
    rendezvous: Mutex<Option<Rendezvous>>,
}

impl Shared {
    fn row_lock(&self, id: i64) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.row_locks).entry(id).or_default().clone()
    }

    fn account_exists(&self, id: i64) -> bool {
        lock(&self.tables).accounts.contains_key(&id)
    }
}

fn paginate<T>(rows: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    rows.skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

/// Ledger store held entirely in memory
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    shared: Arc<Shared>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every balance update on `account_id` fail with a backend error
    pub fn fail_balance_updates_for(&self, account_id: i64) {
        self.shared
            .fail_balance_update
            .store(account_id, Ordering::SeqCst);
    }

    pub fn clear_faults(&self) {
        self.shared.fail_balance_update.store(0, Ordering::SeqCst);
        *lock(&self.shared.rendezvous) = None;
    }

    /// Hold every transaction right after its first row lock until `parties`
    /// transactions have arrived, or `grace` has passed.
    ///
    /// With two transfers in flight this forces the interleaving where each
    /// holds one row before asking for the other. A transaction that is
    /// itself waiting on a row never arrives, so the other one moves on after
    /// `grace`.
    pub fn rendezvous_after_first_lock(&self, parties: usize, grace: Duration) {
        *lock(&self.shared.rendezvous) = Some(Rendezvous {
            barrier: Arc::new(Barrier::new(parties)),
            grace,
        });
    }

    /// Committed entries across all accounts
    pub fn all_entries(&self) -> Vec<Entry> {
        lock(&self.shared.tables).entries.clone()
    }

    /// Committed transfers across all accounts
    pub fn all_transfers(&self) -> Vec<Transfer> {
        lock(&self.shared.tables).transfers.clone()
    }

    /// Sum of all committed balances
    pub fn total_balance(&self) -> i64 {
        lock(&self.shared.tables)
            .accounts
            .values()
            .map(|a| a.balance)
            .sum()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        Ok(Box::new(MemoryLedgerTx {
            shared: self.shared.clone(),
            held: HashMap::new(),
            deltas: HashMap::new(),
            transfers: Vec::new(),
            entries: Vec::new(),
        }))
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let mut tables = lock(&self.shared.tables);
        if tables
            .accounts
            .values()
            .any(|a| a.owner == account.owner && a.currency == account.currency)
        {
            return Err(StoreError::UniqueViolation("owner_currency_key".to_string()));
        }
        tables.next_account_id += 1;
        let row = Account {
            id: tables.next_account_id,
            owner: account.owner.clone(),
            balance: account.balance,
            currency: account.currency.clone(),
            created_at: Utc::now(),
        };
        tables.accounts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        lock(&self.shared.tables)
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_accounts(&self, owner: &str, page: Page) -> Result<Vec<Account>, StoreError> {
        let tables = lock(&self.shared.tables);
        let rows = tables.accounts.values().filter(|a| a.owner == owner).cloned();
        Ok(paginate(rows, page))
    }

    async fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
        lock(&self.shared.tables)
            .transfers
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_transfers(
        &self,
        account_id: i64,
        page: Page,
    ) -> Result<Vec<Transfer>, StoreError> {
        let tables = lock(&self.shared.tables);
        let rows = tables
            .transfers
            .iter()
            .filter(|t| t.from_account_id == account_id || t.to_account_id == account_id)
            .cloned();
        Ok(paginate(rows, page))
    }

    async fn list_entries(&self, account_id: i64, page: Page) -> Result<Vec<Entry>, StoreError> {
        let tables = lock(&self.shared.tables);
        let rows = tables
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned();
        Ok(paginate(rows, page))
    }
}

/// Open in-memory transaction
pub struct MemoryLedgerTx {
    shared: Arc<Shared>,
    held: HashMap<i64, OwnedMutexGuard<()>>,
    deltas: HashMap<i64, i64>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
}

impl MemoryLedgerTx {
    /// Acquire the row lock for `id` unless this transaction already holds it
    async fn lock_row(&mut self, id: i64) -> Result<(), StoreError> {
        if self.held.contains_key(&id) {
            return Ok(());
        }
        if !self.shared.account_exists(id) {
            return Err(StoreError::NotFound);
        }
        let row_lock = self.shared.row_lock(id);
        let guard = row_lock.lock_owned().await;
        self.held.insert(id, guard);

        if self.held.len() == 1 {
            let meeting = lock(&self.shared.rendezvous)
                .as_ref()
                .map(|r| (r.barrier.clone(), r.grace));
            if let Some((barrier, grace)) = meeting {
                let _ = tokio::time::timeout(grace, barrier.wait()).await;
            }
        }
        Ok(())
    }

    /// Committed row plus this transaction's pending delta
    fn visible_account(&self, id: i64) -> Result<Account, StoreError> {
        let mut account = lock(&self.shared.tables)
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        let pending = self.deltas.get(&id).copied().unwrap_or(0);
        account.balance = apply_delta(id, account.balance, pending)?;
        Ok(account)
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        if amount <= 0 || from_account_id == to_account_id {
            return Err(StoreError::Backend(
                "check constraint violated on transfers".to_string(),
            ));
        }
        let mut tables = lock(&self.shared.tables);
        for id in [from_account_id, to_account_id] {
            if !tables.accounts.contains_key(&id) {
                return Err(StoreError::ForeignKeyViolation(
                    "transfers_account_id_fkey".to_string(),
                ));
            }
        }
        tables.next_transfer_id += 1;
        let row = Transfer {
            id: tables.next_transfer_id,
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(row.clone());
        Ok(row)
    }

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError> {
        let mut tables = lock(&self.shared.tables);
        if !tables.accounts.contains_key(&account_id) {
            return Err(StoreError::ForeignKeyViolation(
                "entries_account_id_fkey".to_string(),
            ));
        }
        tables.next_entry_id += 1;
        let row = Entry {
            id: tables.next_entry_id,
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(row.clone());
        Ok(row)
    }

    async fn get_account_for_update(&mut self, id: i64) -> Result<Account, StoreError> {
        self.lock_row(id).await?;
        self.visible_account(id)
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        if self.shared.fail_balance_update.load(Ordering::SeqCst) == id {
            return Err(StoreError::Backend(format!(
                "injected failure updating account {id}"
            )));
        }
        self.lock_row(id).await?;
        let pending = self.deltas.get(&id).copied().unwrap_or(0);
        let pending = apply_delta(id, pending, delta)?;
        let previous = self.deltas.insert(id, pending);
        let account = self.visible_account(id);
        if account.is_err() {
            // Leave the transaction as it was before the failed statement
            match previous {
                Some(p) => self.deltas.insert(id, p),
                None => self.deltas.remove(&id),
            };
        }
        account
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryLedgerTx {
            shared,
            held,
            deltas,
            transfers,
            entries,
        } = *self;
        {
            let mut tables = lock(&shared.tables);
            let mut balances = Vec::with_capacity(deltas.len());
            for (id, delta) in deltas {
                let account = tables.accounts.get(&id).ok_or(StoreError::NotFound)?;
                balances.push((id, apply_delta(id, account.balance, delta)?));
            }
            for (id, balance) in balances {
                if let Some(account) = tables.accounts.get_mut(&id) {
                    account.balance = balance;
                }
            }
            tables.transfers.extend(transfers);
            tables.entries.extend(entries);
        }
        // Row locks are released only after the writes are visible
        drop(held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
