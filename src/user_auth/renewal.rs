//! Access-token renewal stages
//!
//! ```text
//! Pending --verify refresh token--> Verified --load session--> SessionLoaded
//!                                                                  |
//!                                       check_session ok --> Authorized
//! any failing step ------------------------------------------> Rejected
//! ```
//!
//! The session checks are pure so they can be exercised without a store.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::session::Session;
use crate::token::{Payload, TokenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalStage {
    Pending,
    Verified,
    SessionLoaded,
    Authorized,
    Rejected,
}

/// Why a renewal was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("expired")]
    Expired,
    #[error("invalid")]
    Invalid,
    #[error("session not found")]
    SessionNotFound,
    #[error("blocked")]
    Blocked,
    #[error("mismatched subject")]
    MismatchedSubject,
    #[error("superseded token")]
    SupersededToken,
    #[error("session expired")]
    SessionExpired,
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Rejection::SessionNotFound => ErrorKind::NotFound,
            _ => ErrorKind::Unauthorized,
        }
    }

    /// Last stage reached before the rejection
    pub fn stage(&self) -> RenewalStage {
        match self {
            Rejection::Expired | Rejection::Invalid => RenewalStage::Pending,
            Rejection::SessionNotFound => RenewalStage::Verified,
            _ => RenewalStage::SessionLoaded,
        }
    }
}

impl From<TokenError> for Rejection {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Rejection::Expired,
            _ => Rejection::Invalid,
        }
    }
}

impl From<Rejection> for AppError {
    fn from(r: Rejection) -> Self {
        AppError::new(r.kind(), r.to_string())
    }
}

/// Validate a loaded session against the verified refresh payload and the
/// token the client presented. Checks run in a fixed order and the first
/// failure wins.
pub fn check_session(
    payload: &Payload,
    session: &Session,
    presented_token: &str,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    if session.is_blocked {
        return Err(Rejection::Blocked);
    }
    if session.owner != payload.subject() {
        return Err(Rejection::MismatchedSubject);
    }
    if session.refresh_token != presented_token {
        return Err(Rejection::SupersededToken);
    }
    if session.is_expired_at(now) {
        return Err(Rejection::SessionExpired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenMaker;
    use chrono::Duration;
    use uuid::Uuid;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn issued(subject: &str) -> (String, Payload) {
        TokenMaker::new(SECRET)
            .unwrap()
            .issue_refresh_token(subject, Duration::hours(1))
            .unwrap()
    }

    fn session_for(token: &str, payload: &Payload) -> Session {
        Session {
            id: payload.token_id(),
            owner: payload.subject().to_string(),
            refresh_token: token.to_string(),
            user_agent: String::new(),
            client_ip: String::new(),
            is_blocked: false,
            expires_at: payload.expires_at(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_session_passes() {
        let (token, payload) = issued("alice");
        let session = session_for(&token, &payload);
        assert_eq!(check_session(&payload, &session, &token, Utc::now()), Ok(()));
    }

    #[test]
    fn test_blocked() {
        let (token, payload) = issued("alice");
        let mut session = session_for(&token, &payload);
        session.is_blocked = true;
        assert_eq!(
            check_session(&payload, &session, &token, Utc::now()),
            Err(Rejection::Blocked)
        );
    }

    #[test]
    fn test_mismatched_subject() {
        let (token, payload) = issued("alice");
        let mut session = session_for(&token, &payload);
        session.owner = "mallory".into();
        assert_eq!(
            check_session(&payload, &session, &token, Utc::now()),
            Err(Rejection::MismatchedSubject)
        );
    }

    #[test]
    fn test_superseded_token() {
        let (token, payload) = issued("alice");
        let (newer, _) = issued("alice");
        let session = session_for(&newer, &payload);
        assert_eq!(
            check_session(&payload, &session, &token, Utc::now()),
            Err(Rejection::SupersededToken)
        );
    }

    #[test]
    fn test_session_expired() {
        let (token, payload) = issued("alice");
        let session = session_for(&token, &payload);
        let later = session.expires_at + Duration::seconds(1);
        assert_eq!(
            check_session(&payload, &session, &token, later),
            Err(Rejection::SessionExpired)
        );
    }

    #[test]
    fn test_blocked_wins_over_other_failures() {
        let (token, payload) = issued("alice");
        let session = Session {
            id: Uuid::new_v4(),
            owner: "mallory".into(),
            refresh_token: "other".into(),
            is_blocked: true,
            expires_at: Utc::now() - Duration::hours(1),
            ..session_for(&token, &payload)
        };
        assert_eq!(
            check_session(&payload, &session, &token, Utc::now()),
            Err(Rejection::Blocked)
        );
    }

    #[test]
    fn test_rejection_kinds() {
        assert_eq!(Rejection::SessionNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(Rejection::Blocked.kind(), ErrorKind::Unauthorized);
        assert_eq!(Rejection::from(TokenError::Expired), Rejection::Expired);
        assert_eq!(Rejection::from(TokenError::InvalidToken), Rejection::Invalid);
        assert_eq!(Rejection::Blocked.stage(), RenewalStage::SessionLoaded);

        let err = AppError::from(Rejection::SupersededToken);
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.message(), "superseded token");
    }
}
