//! PostgreSQL schema
//!
//! Executed statement by statement at start-up; every statement is idempotent.

use sqlx::PgPool;

pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    username            VARCHAR PRIMARY KEY,
    hashed_password     VARCHAR NOT NULL,
    full_name           VARCHAR NOT NULL,
    email               VARCHAR UNIQUE NOT NULL,
    password_changed_at TIMESTAMPTZ NOT NULL DEFAULT '0001-01-01 00:00:00Z',
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id         BIGSERIAL PRIMARY KEY,
    owner      VARCHAR NOT NULL REFERENCES users (username),
    balance    BIGINT NOT NULL,
    currency   VARCHAR(3) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT owner_currency_key UNIQUE (owner, currency)
)
"#;

pub const CREATE_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id         BIGSERIAL PRIMARY KEY,
    account_id BIGINT NOT NULL REFERENCES accounts (id),
    amount     BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_TRANSFERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transfers (
    id              BIGSERIAL PRIMARY KEY,
    from_account_id BIGINT NOT NULL REFERENCES accounts (id),
    to_account_id   BIGINT NOT NULL REFERENCES accounts (id),
    amount          BIGINT NOT NULL CHECK (amount > 0),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (from_account_id <> to_account_id)
)
"#;

pub const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id            UUID PRIMARY KEY,
    owner         VARCHAR NOT NULL REFERENCES users (username),
    refresh_token VARCHAR NOT NULL,
    user_agent    VARCHAR NOT NULL,
    client_ip     VARCHAR NOT NULL,
    is_blocked    BOOLEAN NOT NULL DEFAULT FALSE,
    expires_at    TIMESTAMPTZ NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_INDEXES: [&str; 5] = [
    "CREATE INDEX IF NOT EXISTS accounts_owner_idx ON accounts (owner)",
    "CREATE INDEX IF NOT EXISTS entries_account_id_idx ON entries (account_id)",
    "CREATE INDEX IF NOT EXISTS transfers_from_account_id_idx ON transfers (from_account_id)",
    "CREATE INDEX IF NOT EXISTS transfers_to_account_id_idx ON transfers (to_account_id)",
    "CREATE INDEX IF NOT EXISTS sessions_owner_idx ON sessions (owner)",
];

/// Initialize the ledger schema
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (name, ddl) in [
        ("users", CREATE_USERS_TABLE),
        ("accounts", CREATE_ACCOUNTS_TABLE),
        ("entries", CREATE_ENTRIES_TABLE),
        ("transfers", CREATE_TRANSFERS_TABLE),
        ("sessions", CREATE_SESSIONS_TABLE),
    ] {
        sqlx::query(ddl).execute(pool).await.inspect_err(|e| {
            tracing::error!(table = name, error = %e, "Failed to create table");
        })?;
    }

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}
