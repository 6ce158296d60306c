use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::models::{NewUser, User, UserChanges};
use super::repository::UserStore;
use crate::db::StoreError;

const USER_COLUMNS: &str =
    "username, hashed_password, full_name, email, password_changed_at, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"INSERT INTO users (username, hashed_password, full_name, email)
               VALUES ($1, $2, $3, $4)
               RETURNING {USER_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.hashed_password)
            .bind(&user.full_name)
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user(&self, username: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_user(
        &self,
        username: &str,
        changes: &UserChanges,
    ) -> Result<User, StoreError> {
        let sql = format!(
            r#"UPDATE users SET
                 hashed_password = COALESCE($1, hashed_password),
                 password_changed_at = COALESCE($2, password_changed_at),
                 full_name = COALESCE($3, full_name),
                 email = COALESCE($4, email)
               WHERE username = $5
               RETURNING {USER_COLUMNS}"#
        );
        let password_changed_at = changes.hashed_password.as_ref().map(|_| Utc::now());
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(&changes.hashed_password)
            .bind(password_changed_at)
            .bind(&changes.full_name)
            .bind(&changes.email)
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}
