//! Session Authority
//!
//! Registry of refresh sessions, one row per login, keyed by the refresh
//! token's token id. Only looked up during renewal; validation of the loaded
//! row is the renewal flow's job, see [`crate::user_auth::renewal`].

pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use memory::MemorySessionStore;
pub use models::Session;
pub use postgres::PgSessionStore;
pub use repository::SessionStore;

use std::sync::Arc;

use uuid::Uuid;

use crate::db::StoreError;
use crate::error::AppError;

/// Translates session store results into the error taxonomy
#[derive(Clone)]
pub struct SessionAuthority {
    store: Arc<dyn SessionStore>,
}

impl SessionAuthority {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Persist a new session. Any store failure is `Internal`.
    pub async fn create(&self, session: &Session) -> Result<Session, AppError> {
        let created = self.store.create_session(session).await.map_err(|e| {
            tracing::error!(session_id = %session.id, error = %e, "Failed to create session");
            AppError::internal("failed to create session").with_source(e)
        })?;
        tracing::info!(session_id = %created.id, owner = %created.owner, "Session created");
        Ok(created)
    }

    /// Load a session by id. No validation of its state happens here.
    pub async fn get(&self, id: Uuid) -> Result<Session, AppError> {
        self.store.get_session(id).await.map_err(|e| match e {
            StoreError::NotFound => AppError::not_found("session not found"),
            other => AppError::from(other),
        })
    }

    /// Admin action: mark a session as blocked
    pub async fn block(&self, id: Uuid) -> Result<Session, AppError> {
        let session = self.store.block_session(id).await.map_err(|e| match e {
            StoreError::NotFound => AppError::not_found("session not found"),
            other => AppError::from(other),
        })?;
        tracing::warn!(session_id = %id, owner = %session.owner, "Session blocked");
        Ok(session)
    }
}
