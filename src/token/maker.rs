use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::TokenError;
use super::payload::Payload;

/// Minimum symmetric key size: 256 bits
pub const MIN_SECRET_LEN: usize = 32;

/// Wire claims. Never handed out; converted into [`Payload`] after checks.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    jti: Uuid,
    iat: i64,
    exp: i64,
}

impl Claims {
    fn into_payload(self) -> Result<Payload, TokenError> {
        let issued_at = DateTime::from_timestamp(self.iat, 0).ok_or(TokenError::InvalidToken)?;
        let expires_at = DateTime::from_timestamp(self.exp, 0).ok_or(TokenError::InvalidToken)?;
        Ok(Payload {
            subject: self.sub,
            token_id: self.jti,
            issued_at,
            expires_at,
        })
    }
}

/// HS256 token signer and verifier
pub struct TokenMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenMaker {
    /// Build a maker from the symmetric secret.
    ///
    /// Fails if the secret is shorter than [`MIN_SECRET_LEN`] bytes; call this
    /// once at start-up.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::SecretTooShort(secret.len()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign a fresh payload for `subject` valid for `ttl`.
    ///
    /// Returns the token string and the payload it carries, so callers can
    /// read the token id or expiry without verifying again.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<(String, Payload), TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing(format!("ttl out of range: {ttl}")))?;

        let claims = Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok((token, claims.into_payload()?))
    }

    pub fn issue_access_token(
        &self,
        subject: &str,
        ttl: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let issued = self.issue(subject, ttl)?;
        tracing::debug!(subject, token_id = %issued.1.token_id(), "Issued access token");
        Ok(issued)
    }

    pub fn issue_refresh_token(
        &self,
        subject: &str,
        ttl: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let issued = self.issue(subject, ttl)?;
        tracing::debug!(subject, token_id = %issued.1.token_id(), "Issued refresh token");
        Ok(issued)
    }

    /// Check signature, algorithm and expiry, then return the payload
    pub fn verify(&self, token: &str) -> Result<Payload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        data.claims.into_payload()
    }
}
