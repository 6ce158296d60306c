use async_trait::async_trait;

use super::models::{NewUser, User, UserChanges};
use crate::db::StoreError;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Duplicate username or email is a `UniqueViolation`
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError>;

    async fn get_user(&self, username: &str) -> Result<User, StoreError>;

    /// Apply the present fields. A new password also stamps
    /// `password_changed_at`. Unknown user is `NotFound`, a taken email a
    /// `UniqueViolation`.
    async fn update_user(
        &self,
        username: &str,
        changes: &UserChanges,
    ) -> Result<User, StoreError>;
}
