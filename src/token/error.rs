use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, unexpected algorithm, malformed or missing claims
    #[error("invalid token")]
    InvalidToken,

    /// Signature is valid but `exp` has passed
    #[error("token has expired")]
    Expired,

    #[error("invalid key size {0}: must be at least 32 bytes")]
    SecretTooShort(usize),

    #[error("failed to generate token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidToken,
        }
    }
}
