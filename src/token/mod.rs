//! Credential Issuer
//!
//! Stateless HS256 signer/verifier of bearer tokens carrying a subject, a
//! unique token id and a mandatory expiry.

pub mod error;
pub mod maker;
pub mod payload;

pub use error::TokenError;
pub use maker::{MIN_SECRET_LEN, TokenMaker};
pub use payload::Payload;
