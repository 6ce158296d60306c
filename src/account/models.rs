//! Data models for accounts, ledger entries and transfers

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Customer account. `balance` is in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only ledger line: one signed balance delta for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Logical record of funds moving from one account to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Everything a committed transfer touched. Not persisted as its own row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// Input for opening an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub owner: String,
    pub currency: String,
    pub balance: i64,
}

/// Pagination window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    /// Build a page, clamping `limit` into 1..=100 and `offset` to >= 0
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset: offset.max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(10, 0)
    }
}
