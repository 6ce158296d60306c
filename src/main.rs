//! Ledger service entry point
//!
//! ```text
//! config/<env>.yaml ─▶ logging ─▶ PostgreSQL (or in-memory) stores
//!                                        │
//!                     LedgerEngine ◀─────┴────▶ AuthService
//!                           └──── gateway (axum) ────┘
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use bank_ledger::account::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use bank_ledger::config::AppConfig;
use bank_ledger::db::Database;
use bank_ledger::gateway::{self, AppState};
use bank_ledger::ledger::LedgerEngine;
use bank_ledger::logging::init_logging;
use bank_ledger::notify::LogNotifier;
use bank_ledger::session::{MemorySessionStore, PgSessionStore, SessionAuthority, SessionStore};
use bank_ledger::token::TokenMaker;
use bank_ledger::user_auth::{
    Argon2Hasher, AuthService, MemoryUserStore, PgUserStore, TokenTtls, UserStore,
};

fn get_env() -> String {
    arg_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

/// Port override from the command line (`--port`)
fn get_port_override() -> Option<u16> {
    arg_value(&["--port", "-p"]).and_then(|p| p.parse().ok())
}

fn arg_value(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|w| names.contains(&w[0].as_str()))
        .map(|w| w[1].clone())
}

struct Stores {
    ledger: Arc<dyn LedgerStore>,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    db: Option<Arc<Database>>,
}

async fn open_stores(config: &AppConfig) -> Result<Stores> {
    let Some(url) = config.postgres_url.as_deref() else {
        tracing::warn!("postgres_url not set; using in-memory stores, data is lost on exit");
        return Ok(Stores {
            ledger: Arc::new(MemoryLedgerStore::new()),
            users: Arc::new(MemoryUserStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            db: None,
        });
    };

    let db = Database::connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    db.migrate().await.context("failed to initialize schema")?;
    let pool = db.pool().clone();

    Ok(Stores {
        ledger: Arc::new(
            PgLedgerStore::new(pool.clone()).with_lock_timeout(config.ledger.transfer_timeout()),
        ),
        users: Arc::new(PgUserStore::new(pool.clone())),
        sessions: Arc::new(PgSessionStore::new(pool)),
        db: Some(Arc::new(db)),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }

    let _guard = init_logging(&config);
    tracing::info!(env = %env, version = env!("GIT_HASH"), "Starting bank_ledger");

    let tokens = Arc::new(
        TokenMaker::new(&config.auth.token_symmetric_key).context("invalid token configuration")?,
    );
    let stores = open_stores(&config).await?;

    let ledger = Arc::new(LedgerEngine::new(
        stores.ledger,
        config.ledger.transfer_timeout(),
    ));
    let auth = Arc::new(AuthService::new(
        stores.users,
        SessionAuthority::new(stores.sessions),
        tokens,
        Arc::new(Argon2Hasher::new()),
        Arc::new(LogNotifier),
        TokenTtls {
            access: config.auth.access_token_ttl(),
            refresh: config.auth.refresh_token_ttl(),
        },
    ));

    let state = Arc::new(AppState::new(ledger, auth, stores.db));
    gateway::run_server(&config.gateway.host, config.gateway.port, state).await
}
