use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::AppError;

/// Opaque password hashing collaborator
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable
    fn verify(&self, hash: &str, plaintext: &str) -> Result<bool, AppError>;
}

/// Argon2id, PHC string output with a random salt per hash
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Custom cost parameters (tests use the cheapest valid ones)
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal("failed to hash password").with_source(e))?;
        Ok(hash.to_string())
    }

    fn verify(&self, hash: &str, plaintext: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::internal("stored password hash is malformed").with_source(e))?;
        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal("failed to verify password").with_source(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(Params::new(8, 1, 1, None).unwrap())
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("secret-password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&hash, "secret-password").unwrap());
        assert!(!hasher.verify(&hash, "wrong-password").unwrap());
    }

    #[test]
    fn test_salt_is_random() {
        let hasher = hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        let err = hasher().verify("plaintext-in-db", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_hash_errors_keep_their_cause() {
        use std::error::Error as _;

        let err = hasher().verify("$argon2id$v=19$broken", "x").unwrap_err();
        let cause = err.source().expect("argon2 error attached as source");
        assert!(!cause.to_string().is_empty());
    }
}
