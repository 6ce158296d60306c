use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Server-side record backing a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Session {
    /// Equal to the refresh token's embedded token id
    pub id: Uuid,
    pub owner: String,
    /// Stored for equality comparison only
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
