//! HTTP gateway
//!
//! Thin axum transport over the ledger and auth services. Handlers parse
//! requests, call exactly one service operation and render the outcome;
//! all rules live below this layer.

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use tokio::net::TcpListener;

pub use response::{ApiResponse, error_codes};
pub use state::AppState;

/// Build the `/api/v1` router
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/users", post(handlers::create_user))
        .route("/users/login", post(handlers::login_user))
        .route("/tokens/renew_access", post(handlers::renew_access_token));

    let private_routes = Router::new()
        .route("/users", patch(handlers::update_user))
        .route(
            "/accounts",
            post(handlers::create_account).get(handlers::list_accounts),
        )
        .route("/accounts/{id}", get(handlers::get_account))
        .route("/accounts/{id}/entries", get(handlers::list_entries))
        .route("/accounts/{id}/transfers", get(handlers::list_transfers))
        .route("/transfers", post(handlers::create_transfer))
        .route("/transfers/{id}", get(handlers::get_transfer))
        .layer(from_fn_with_state(state.clone(), middleware::bearer_auth));

    Router::new()
        .nest("/api/v1", public_routes.merge(private_routes))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "Gateway listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("gateway server error")
}
