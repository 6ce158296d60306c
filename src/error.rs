//! Shared error taxonomy
//!
//! Every fallible operation above the store boundary returns [`AppError`].
//! Callers branch on [`AppError::kind`], never on the message text.

use std::fmt;

use thiserror::Error;

use crate::db::StoreError;
use crate::token::TokenError;

/// Boxed underlying cause, kept for logging only.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Machine-checkable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    /// Malformed or mismatched input (wrong currency, self-transfer, ...)
    BadRequest,
    /// Duplicate resource
    Conflict,
    /// Bad, expired, blocked or mismatched credential or session
    Unauthorized,
    /// Store or signing failure
    Internal,
}

impl ErrorKind {
    /// Stable code string for API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Suggested HTTP status. Rendering is a transport concern.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error: kind + human message + optional wrapped cause
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        let kind = match &e {
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::UniqueViolation(_) => ErrorKind::Conflict,
            StoreError::ForeignKeyViolation(_) => ErrorKind::NotFound,
            StoreError::Database(_) | StoreError::Backend(_) => ErrorKind::Internal,
        };
        let message = match kind {
            ErrorKind::NotFound => "record not found",
            ErrorKind::Conflict => "record already exists",
            _ => "internal server error",
        };
        AppError::new(kind, message).with_source(e)
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        let kind = match e {
            TokenError::InvalidToken | TokenError::Expired => ErrorKind::Unauthorized,
            TokenError::SecretTooShort(_) | TokenError::Signing(_) => ErrorKind::Internal,
        };
        AppError::new(kind, e.to_string()).with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(ErrorKind::Unauthorized.to_string(), "UNAUTHORIZED");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AppError::not_found("x").http_status(), 404);
        assert_eq!(AppError::bad_request("x").http_status(), 400);
        assert_eq!(AppError::conflict("x").http_status(), 409);
        assert_eq!(AppError::unauthorized("x").http_status(), 401);
        assert_eq!(AppError::internal("x").http_status(), 500);
    }

    #[test]
    fn test_store_error_translation() {
        assert!(AppError::from(StoreError::NotFound).is(ErrorKind::NotFound));
        assert!(AppError::from(StoreError::UniqueViolation("uq".into())).is(ErrorKind::Conflict));
        assert!(
            AppError::from(StoreError::ForeignKeyViolation("fk".into())).is(ErrorKind::NotFound)
        );
        assert!(AppError::from(StoreError::Backend("down".into())).is(ErrorKind::Internal));
    }

    #[test]
    fn test_source_is_kept() {
        let err = AppError::from(StoreError::Backend("connection reset".into()));
        assert_eq!(err.to_string(), "internal server error");
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("connection reset"));
    }

    #[test]
    fn test_token_error_translation() {
        assert!(AppError::from(TokenError::Expired).is(ErrorKind::Unauthorized));
        assert!(AppError::from(TokenError::InvalidToken).is(ErrorKind::Unauthorized));
        assert!(AppError::from(TokenError::Signing("boom".into())).is(ErrorKind::Internal));
    }
}
