use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::models::Session;
use super::repository::SessionStore;
use crate::db::StoreError;

/// In-process session registry, last writer wins
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: &Session) -> Result<Session, StoreError> {
        let mut sessions = self.sessions();
        if sessions.contains_key(&session.id) {
            return Err(StoreError::UniqueViolation("sessions_pkey".to_string()));
        }
        sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, StoreError> {
        self.sessions().get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn block_session(&self, id: Uuid) -> Result<Session, StoreError> {
        let mut sessions = self.sessions();
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        session.is_blocked = true;
        Ok(session.clone())
    }
}
