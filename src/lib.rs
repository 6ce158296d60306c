//! bank_ledger - double-entry ledger core
//!
//! Atomic funds transfers between accounts, plus the credential and session
//! authority that decides who may move money.
//!
//! # Modules
//!
//! - [`ledger`] - Transfer engine and account/entry/transfer queries
//! - [`account`] - Ledger data model and transactional store contract
//! - [`token`] - Signed, expiring bearer tokens
//! - [`session`] - Refresh sessions
//! - [`user_auth`] - Users, login and access-token renewal
//! - [`notify`] - Best-effort notifications
//! - [`gateway`] - HTTP transport
//! - [`db`] - PostgreSQL pool and schema
//! - [`error`] - Error taxonomy shared by every component

pub mod account;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod session;
pub mod token;
pub mod user_auth;

pub use error::{AppError, ErrorKind};
pub use ledger::{LedgerEngine, TransferRequest};
pub use session::{Session, SessionAuthority};
pub use token::{Payload, TokenError, TokenMaker};
pub use user_auth::AuthService;
