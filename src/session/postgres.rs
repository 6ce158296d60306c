use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::Session;
use super::repository::SessionStore;
use crate::db::StoreError;

const SESSION_COLUMNS: &str =
    "id, owner, refresh_token, user_agent, client_ip, is_blocked, expires_at, created_at";

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create_session(&self, session: &Session) -> Result<Session, StoreError> {
        let sql = format!(
            r#"INSERT INTO sessions (id, owner, refresh_token, user_agent, client_ip, is_blocked, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {SESSION_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, Session>(&sql)
            .bind(session.id)
            .bind(&session.owner)
            .bind(&session.refresh_token)
            .bind(&session.user_agent)
            .bind(&session.client_ip)
            .bind(session.is_blocked)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, StoreError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let row = sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn block_session(&self, id: Uuid) -> Result<Session, StoreError> {
        let sql = format!(
            "UPDATE sessions SET is_blocked = TRUE WHERE id = $1 RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}
