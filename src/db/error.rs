//! Store-boundary error sentinels
//!
//! Driver errors are classified exactly once, here. Everything above the
//! store traits sees either a [`StoreError`] or the translated
//! [`crate::error::AppError`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Non-SQL backend failure (in-memory store faults, lost lock, ...)
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        let classified = match &e {
            sqlx::Error::RowNotFound => return StoreError::NotFound,
            sqlx::Error::Database(db) => {
                let constraint = db.constraint().unwrap_or_default().to_string();
                match db.kind() {
                    ErrorKind::UniqueViolation => Some(StoreError::UniqueViolation(constraint)),
                    ErrorKind::ForeignKeyViolation => {
                        Some(StoreError::ForeignKeyViolation(constraint))
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        classified.unwrap_or(StoreError::Database(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn test_other_driver_errors_are_wrapped() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(err.to_string().starts_with("database error"));
    }
}
