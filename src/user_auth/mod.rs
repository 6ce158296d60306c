//! User authentication
//!
//! Registration, password login and access-token renewal. Login issues an
//! access/refresh token pair and records a session keyed by the refresh
//! token's id; renewal walks the stages in [`renewal`].

pub mod memory;
pub mod models;
pub mod password;
pub mod postgres;
pub mod renewal;
pub mod repository;
pub mod service;

pub use memory::MemoryUserStore;
pub use models::{
    ClientMeta, LoginResult, NewUser, RegisterUser, RenewedAccessToken, UpdateUser, User,
    UserChanges,
};
pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres::PgUserStore;
pub use renewal::{Rejection, RenewalStage};
pub use repository::UserStore;
pub use service::{AuthService, TokenTtls};
