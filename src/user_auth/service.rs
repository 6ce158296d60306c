use std::sync::Arc;

use chrono::{Duration, Utc};

use super::models::{
    ClientMeta, LoginResult, NewUser, RegisterUser, RenewedAccessToken, UpdateUser, User,
    UserChanges,
};
use super::password::PasswordHasher;
use super::renewal::{self, Rejection, RenewalStage};
use super::repository::UserStore;
use crate::db::StoreError;
use crate::error::{AppError, ErrorKind};
use crate::notify::{self, Notifier};
use crate::session::{Session, SessionAuthority};
use crate::token::{Payload, TokenMaker};

/// Lifetimes of issued tokens
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::hours(24),
        }
    }
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionAuthority,
    tokens: Arc<TokenMaker>,
    hasher: Arc<dyn PasswordHasher>,
    notifier: Arc<dyn Notifier>,
    ttls: TokenTtls,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: SessionAuthority,
        tokens: Arc<TokenMaker>,
        hasher: Arc<dyn PasswordHasher>,
        notifier: Arc<dyn Notifier>,
        ttls: TokenTtls,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            hasher,
            notifier,
            ttls,
        }
    }

    pub fn sessions(&self) -> &SessionAuthority {
        &self.sessions
    }

    /// Create a user, then send the verification email in the background
    pub async fn register(&self, input: &RegisterUser) -> Result<User, AppError> {
        input.validate()?;

        let new_user = NewUser {
            username: input.username.clone(),
            hashed_password: self.hasher.hash(&input.password)?,
            full_name: input.full_name.trim().to_string(),
            email: input.email.to_lowercase(),
        };

        let user = self.users.create_user(&new_user).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                AppError::conflict("username or email already exists").with_source(e)
            }
            other => AppError::from(other),
        })?;
        tracing::info!(username = %user.username, "User registered");

        notify::dispatch_verify_email(
            self.notifier.clone(),
            user.username.clone(),
            user.email.clone(),
        );
        Ok(user)
    }

    /// Change the caller's own profile. Only the fields present are touched.
    pub async fn update_user(
        &self,
        caller: &Payload,
        input: &UpdateUser,
    ) -> Result<User, AppError> {
        if input.username != caller.subject() {
            tracing::warn!(
                username = %input.username,
                caller = caller.subject(),
                "User update rejected: not the caller's own profile"
            );
            return Err(AppError::unauthorized("cannot update another user's info"));
        }
        input.validate()?;

        let map_store = |e: StoreError| match e {
            StoreError::NotFound => AppError::not_found("user not found"),
            StoreError::UniqueViolation(_) => {
                AppError::conflict("email already in use").with_source(e)
            }
            other => AppError::from(other),
        };
        if input.is_empty() {
            return self.users.get_user(&input.username).await.map_err(map_store);
        }

        let changes = UserChanges {
            full_name: input.full_name.as_deref().map(|n| n.trim().to_string()),
            email: input.email.as_deref().map(str::to_lowercase),
            hashed_password: input
                .password
                .as_deref()
                .map(|p| self.hasher.hash(p))
                .transpose()?,
        };
        let user = self
            .users
            .update_user(&input.username, &changes)
            .await
            .map_err(map_store)?;

        tracing::info!(
            username = %user.username,
            password_changed = changes.hashed_password.is_some(),
            "User updated"
        );
        Ok(user)
    }

    /// Password login. Issues an access/refresh pair and records the session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientMeta,
    ) -> Result<LoginResult, AppError> {
        let user = self.users.get_user(username).await.map_err(|e| match e {
            StoreError::NotFound => AppError::not_found("user not found"),
            other => AppError::from(other),
        })?;

        if !self.hasher.verify(&user.hashed_password, password)? {
            tracing::warn!(username, "Login rejected: wrong password");
            return Err(AppError::unauthorized("invalid credentials"));
        }

        let (access_token, access_payload) = self
            .tokens
            .issue_access_token(&user.username, self.ttls.access)?;
        let (refresh_token, refresh_payload) = self
            .tokens
            .issue_refresh_token(&user.username, self.ttls.refresh)?;

        let session = self
            .sessions
            .create(&Session {
                id: refresh_payload.token_id(),
                owner: user.username.clone(),
                refresh_token: refresh_token.clone(),
                user_agent: client.user_agent.clone(),
                client_ip: client.client_ip.clone(),
                is_blocked: false,
                expires_at: refresh_payload.expires_at(),
                created_at: Utc::now(),
            })
            .await?;

        Ok(LoginResult {
            session_id: session.id,
            access_token,
            access_token_expires_at: access_payload.expires_at(),
            refresh_token,
            refresh_token_expires_at: refresh_payload.expires_at(),
            user,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token and its session are left untouched.
    pub async fn renew_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RenewedAccessToken, AppError> {
        let payload = self
            .tokens
            .verify(refresh_token)
            .map_err(|e| reject(Rejection::from(e)))?;
        tracing::debug!(stage = ?RenewalStage::Verified, token_id = %payload.token_id(), "Renewal");

        let session = match self.sessions.get(payload.token_id()).await {
            Ok(session) => session,
            Err(e) if e.is(ErrorKind::NotFound) => return Err(reject(Rejection::SessionNotFound)),
            Err(e) => return Err(e),
        };
        tracing::debug!(stage = ?RenewalStage::SessionLoaded, session_id = %session.id, "Renewal");

        renewal::check_session(&payload, &session, refresh_token, Utc::now()).map_err(reject)?;

        let (access_token, access_payload) = self
            .tokens
            .issue_access_token(payload.subject(), self.ttls.access)?;
        tracing::info!(
            stage = ?RenewalStage::Authorized,
            session_id = %session.id,
            subject = payload.subject(),
            "Access token renewed"
        );

        Ok(RenewedAccessToken {
            access_token,
            access_token_expires_at: access_payload.expires_at(),
        })
    }

    /// Bearer-token check for protected operations
    pub fn verify_access_token(&self, token: &str) -> Result<Payload, AppError> {
        self.tokens.verify(token).map_err(AppError::from)
    }
}

fn reject(rejection: Rejection) -> AppError {
    tracing::warn!(
        stage = ?RenewalStage::Rejected,
        after = ?rejection.stage(),
        reason = %rejection,
        "Access token renewal rejected"
    );
    rejection.into()
}
