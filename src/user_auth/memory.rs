use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{NewUser, User, UserChanges};
use super::repository::UserStore;
use crate::db::StoreError;

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<String, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, HashMap<String, User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut users = self.users();
        if users.contains_key(&user.username) {
            return Err(StoreError::UniqueViolation("users_pkey".to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let row = User {
            username: user.username.clone(),
            hashed_password: user.hashed_password.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            password_changed_at: DateTime::<Utc>::MIN_UTC,
            created_at: Utc::now(),
        };
        users.insert(row.username.clone(), row.clone());
        Ok(row)
    }

    async fn get_user(&self, username: &str) -> Result<User, StoreError> {
        self.users().get(username).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_user(
        &self,
        username: &str,
        changes: &UserChanges,
    ) -> Result<User, StoreError> {
        let mut users = self.users();
        if !users.contains_key(username) {
            return Err(StoreError::NotFound);
        }
        if let Some(email) = &changes.email {
            if users
                .values()
                .any(|u| u.username != username && &u.email == email)
            {
                return Err(StoreError::UniqueViolation("users_email_key".to_string()));
            }
        }

        let user = users.get_mut(username).ok_or(StoreError::NotFound)?;
        if let Some(hashed_password) = &changes.hashed_password {
            user.hashed_password = hashed_password.clone();
            user.password_changed_at = Utc::now();
        }
        if let Some(full_name) = &changes.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        Ok(user.clone())
    }
}
