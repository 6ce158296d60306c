use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::account::{
    Account, Entry, LedgerStore, LedgerTx, NewAccount, Page, Transfer, TransferResult,
};
use crate::db::StoreError;
use crate::error::AppError;
use crate::token::Payload;

/// Currencies an account may be opened in
pub const SUPPORTED_CURRENCIES: [&str; 3] = ["USD", "EUR", "CAD"];

/// Funds movement request, already parsed by the transport layer
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub currency: String,
}

pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    transfer_timeout: Duration,
}

impl LedgerEngine {
    pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(store: Arc<dyn LedgerStore>, transfer_timeout: Duration) -> Self {
        Self {
            store,
            transfer_timeout,
        }
    }

    /// Move `amount` from one account to another.
    ///
    /// `caller` must own the source account. Every precondition is checked
    /// before the transaction starts; any error means no money moved.
    pub async fn transfer(
        &self,
        caller: &Payload,
        req: &TransferRequest,
    ) -> Result<TransferResult, AppError> {
        if req.from_account_id == req.to_account_id {
            return Err(AppError::bad_request("cannot transfer to the same account"));
        }
        if req.amount <= 0 {
            return Err(AppError::bad_request("amount must be greater than zero"));
        }

        let from = self.validate_account(req.from_account_id, &req.currency).await?;
        if from.owner != caller.subject() {
            tracing::warn!(
                account_id = from.id,
                caller = caller.subject(),
                "Transfer rejected: caller does not own source account"
            );
            return Err(AppError::unauthorized("you do not own this account"));
        }
        self.validate_account(req.to_account_id, &req.currency).await?;

        let result = self.execute_transfer(req).await?;

        tracing::info!(
            transfer_id = result.transfer.id,
            from_account_id = req.from_account_id,
            to_account_id = req.to_account_id,
            amount = req.amount,
            currency = %req.currency,
            "Transfer committed"
        );
        Ok(result)
    }

    async fn validate_account(&self, id: i64, currency: &str) -> Result<Account, AppError> {
        let account = self.store.get_account(id).await.map_err(|e| match e {
            StoreError::NotFound => AppError::not_found(format!("account id={id} not found")),
            other => AppError::from(other),
        })?;

        if account.currency != currency {
            return Err(AppError::bad_request(format!(
                "account id={id} currency mismatch: {} vs {currency}",
                account.currency
            )));
        }
        Ok(account)
    }

    /// Run the transfer transaction under the configured timeout.
    ///
    /// Commit happens outside the timeout: once the store accepted the
    /// commit, the transfer stands. A timed-out transaction is dropped, not
    /// rolled back in place, since its connection may still be stuck behind
    /// the statement that timed out.
    async fn execute_transfer(&self, req: &TransferRequest) -> Result<TransferResult, AppError> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| AppError::internal("failed to begin transaction").with_source(e))?;

        let outcome = tokio::time::timeout(self.transfer_timeout, apply_transfer(&mut *tx, req))
            .await;

        match outcome {
            Ok(Ok(result)) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::internal("failed to commit transfer").with_source(e))?;
                Ok(result)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    from_account_id = req.from_account_id,
                    to_account_id = req.to_account_id,
                    error = %e,
                    "Transfer aborted"
                );
                abort(tx).await;
                Err(AppError::internal("internal error").with_source(e))
            }
            Err(_) => {
                tracing::error!(
                    from_account_id = req.from_account_id,
                    to_account_id = req.to_account_id,
                    timeout_ms = self.transfer_timeout.as_millis() as u64,
                    "Transfer timed out"
                );
                // Dropping discards the staged writes; a Postgres transaction
                // queues its ROLLBACK for when the connection frees up
                drop(tx);
                Err(AppError::internal("transfer timed out"))
            }
        }
    }

    /// Open a zero-balance account for the caller
    pub async fn open_account(&self, caller: &Payload, currency: &str) -> Result<Account, AppError> {
        if !SUPPORTED_CURRENCIES.contains(&currency) {
            return Err(AppError::bad_request(format!("unsupported currency: {currency}")));
        }
        let new_account = NewAccount {
            owner: caller.subject().to_string(),
            currency: currency.to_string(),
            balance: 0,
        };
        let account = self
            .store
            .create_account(&new_account)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => AppError::conflict(
                    "an account with this currency already exists for this user",
                )
                .with_source(e),
                StoreError::ForeignKeyViolation(_) => {
                    AppError::not_found("user does not exist").with_source(e)
                }
                other => AppError::from(other),
            })?;

        tracing::info!(account_id = account.id, owner = %account.owner, currency = %account.currency, "Account opened");
        Ok(account)
    }

    /// Fetch an account the caller owns
    pub async fn get_account(&self, caller: &Payload, id: i64) -> Result<Account, AppError> {
        let account = self.store.get_account(id).await.map_err(|e| match e {
            StoreError::NotFound => AppError::not_found(format!("account id={id} not found")),
            other => AppError::from(other),
        })?;
        if account.owner != caller.subject() {
            return Err(AppError::unauthorized(
                "account does not belong to the authenticated user",
            ));
        }
        Ok(account)
    }

    pub async fn list_accounts(
        &self,
        caller: &Payload,
        page: Page,
    ) -> Result<Vec<Account>, AppError> {
        Ok(self.store.list_accounts(caller.subject(), page).await?)
    }

    /// Ledger lines of an account the caller owns
    pub async fn list_entries(
        &self,
        caller: &Payload,
        account_id: i64,
        page: Page,
    ) -> Result<Vec<Entry>, AppError> {
        self.get_account(caller, account_id).await?;
        Ok(self.store.list_entries(account_id, page).await?)
    }

    /// Transfers touching an account the caller owns
    pub async fn list_transfers(
        &self,
        caller: &Payload,
        account_id: i64,
        page: Page,
    ) -> Result<Vec<Transfer>, AppError> {
        self.get_account(caller, account_id).await?;
        Ok(self.store.list_transfers(account_id, page).await?)
    }

    /// A transfer is visible to the owners of either side
    pub async fn get_transfer(&self, caller: &Payload, id: i64) -> Result<Transfer, AppError> {
        let transfer = self.store.get_transfer(id).await.map_err(|e| match e {
            StoreError::NotFound => AppError::not_found(format!("transfer id={id} not found")),
            other => AppError::from(other),
        })?;

        for account_id in [transfer.from_account_id, transfer.to_account_id] {
            let account = self.store.get_account(account_id).await?;
            if account.owner == caller.subject() {
                return Ok(transfer);
            }
        }
        Err(AppError::unauthorized(
            "transfer does not involve an account of the authenticated user",
        ))
    }
}

async fn abort(tx: Box<dyn LedgerTx>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Rollback failed; transaction discarded by the store");
    }
}

async fn apply_transfer(
    tx: &mut dyn LedgerTx,
    req: &TransferRequest,
) -> Result<TransferResult, StoreError> {
    let transfer = tx
        .create_transfer(req.from_account_id, req.to_account_id, req.amount)
        .await?;
    let from_entry = tx.create_entry(req.from_account_id, -req.amount).await?;
    let to_entry = tx.create_entry(req.to_account_id, req.amount).await?;

    // Lower id first, whichever side of the transfer it is
    let (from_account, to_account) = if req.from_account_id < req.to_account_id {
        add_money(
            tx,
            req.from_account_id,
            -req.amount,
            req.to_account_id,
            req.amount,
        )
        .await?
    } else {
        let (to_account, from_account) = add_money(
            tx,
            req.to_account_id,
            req.amount,
            req.from_account_id,
            -req.amount,
        )
        .await?;
        (from_account, to_account)
    };

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

/// Lock both rows in the given order, then apply both deltas
async fn add_money(
    tx: &mut dyn LedgerTx,
    account_id1: i64,
    amount1: i64,
    account_id2: i64,
    amount2: i64,
) -> Result<(Account, Account), StoreError> {
    tx.get_account_for_update(account_id1).await?;
    tx.get_account_for_update(account_id2).await?;

    let account1 = tx.add_account_balance(account_id1, amount1).await?;
    let account2 = tx.add_account_balance(account_id2, amount2).await?;
    Ok((account1, account2))
}
