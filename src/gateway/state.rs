use std::sync::Arc;

use crate::db::Database;
use crate::ledger::LedgerEngine;
use crate::user_auth::AuthService;

/// Shared gateway state
pub struct AppState {
    pub ledger: Arc<LedgerEngine>,
    pub auth: Arc<AuthService>,
    /// `None` when running on the in-memory stores
    pub db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerEngine>, auth: Arc<AuthService>, db: Option<Arc<Database>>) -> Self {
        Self { ledger, auth, db }
    }
}
