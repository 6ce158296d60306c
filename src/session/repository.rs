use async_trait::async_trait;
use uuid::Uuid;

use super::models::Session;
use crate::db::StoreError;

/// Session persistence contract
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<Session, StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Session, StoreError>;

    async fn block_session(&self, id: Uuid) -> Result<Session, StoreError>;
}
