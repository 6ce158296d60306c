use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Verified token claims
///
/// Only [`super::TokenMaker`] builds one, either when issuing or after a
/// successful verification. It is the sole source of truth for who is calling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub(crate) subject: String,
    pub(crate) token_id: Uuid,
    pub(crate) issued_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
}

impl Payload {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn token_id(&self) -> Uuid {
        self.token_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
