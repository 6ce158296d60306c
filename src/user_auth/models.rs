use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Row to insert; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

/// Registration input as received from a client
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

impl RegisterUser {
    /// Field checks. All violations are reported together.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();
        check_username(&self.username, &mut problems);
        check_password(&self.password, &mut problems);
        check_full_name(&self.full_name, &mut problems);
        check_email(&self.email, &mut problems);
        into_result(problems)
    }
}

/// Profile update from the user themselves. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateUser {
    /// Same rules as registration, for the fields that are present
    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();
        if self.username.is_empty() {
            problems.push("username: must be provided");
        }
        if let Some(password) = &self.password {
            check_password(password, &mut problems);
        }
        if let Some(full_name) = &self.full_name {
            check_full_name(full_name, &mut problems);
        }
        if let Some(email) = &self.email {
            check_email(email, &mut problems);
        }
        into_result(problems)
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

/// Column changes for an existing user; the password is already hashed
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
}

fn check_username(username: &str, problems: &mut Vec<&'static str>) {
    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        problems.push("username: must be between 3 and 30 characters");
    } else if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        problems.push("username: only letters, digits and underscores are allowed");
    }
}

fn check_password(password: &str, problems: &mut Vec<&'static str>) {
    if password.len() < 8 {
        problems.push("password: must be at least 8 characters");
    } else if password.len() > 72 {
        problems.push("password: must not exceed 72 characters");
    }
}

fn check_full_name(full_name: &str, problems: &mut Vec<&'static str>) {
    let len = full_name.chars().count();
    if !(3..=50).contains(&len) {
        problems.push("full_name: must be between 3 and 50 characters");
    } else if !full_name
        .chars()
        .all(|c| c.is_alphabetic() || c.is_whitespace())
    {
        problems.push("full_name: can only contain letters and spaces");
    }
}

fn check_email(email: &str, problems: &mut Vec<&'static str>) {
    if !is_valid_email(email) {
        problems.push("email: invalid email format");
    }
}

fn into_result(problems: Vec<&'static str>) -> Result<(), AppError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "validation failed: {}",
            problems.join("; ")
        )))
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Where a login came from, stored on the session
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: String,
    pub client_ip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub session_id: Uuid,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenewedAccessToken {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}
