use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::response::{ApiResponse, error_codes};
use super::state::AppState;
use crate::account::{Account, Entry, Page, Transfer, TransferResult};
use crate::error::AppError;
use crate::ledger::TransferRequest;
use crate::token::Payload;
use crate::user_auth::{
    ClientMeta, LoginResult, RegisterUser, RenewedAccessToken, UpdateUser, User,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub timestamp_ms: u64,
    pub version: &'static str,
}

/// 200 when the store answers, 503 otherwise. No internals are exposed.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    if let Some(db) = &state.db {
        if let Err(e) = db.health_check().await {
            tracing::error!(error = %e, "Health check failed: database unreachable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    code: error_codes::SERVICE_UNAVAILABLE,
                    msg: "unavailable".to_string(),
                    data: None,
                }),
            );
        }
    }

    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms,
            version: env!("GIT_HASH"),
        })),
    )
}

// ----------------------------------------------------------------------------
// Users and tokens
// ----------------------------------------------------------------------------

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterUser>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), AppError> {
    let user = state.auth.register(&req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Bearer protected: the token subject must match `username`
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Json(req): Json<UpdateUser>,
) -> ApiResult<User> {
    ok(state.auth.update_user(&caller, &req).await?)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login_user(
    State(state): State<Arc<AppState>>,
    client: ClientMeta,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResult> {
    ok(state.auth.login(&req.username, &req.password, &client).await?)
}

#[derive(Debug, Deserialize)]
pub struct RenewAccessRequest {
    pub refresh_token: String,
}

pub async fn renew_access_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenewAccessRequest>,
) -> ApiResult<RenewedAccessToken> {
    ok(state.auth.renew_access_token(&req.refresh_token).await?)
}

// ----------------------------------------------------------------------------
// Accounts and transfers (bearer protected)
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub currency: String,
}

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Account>>), AppError> {
    let account = state.ledger.open_account(&caller, &req.currency).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(account))))
}

/// `?page_id=1&page_size=10`, both 1-based and optional
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page_id: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    fn page(&self) -> Result<Page, AppError> {
        let page_id = self.page_id.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(10);
        if page_id < 1 {
            return Err(AppError::bad_request("page_id must be at least 1"));
        }
        if !(1..=Page::MAX_LIMIT).contains(&page_size) {
            return Err(AppError::bad_request(format!(
                "page_size must be between 1 and {}",
                Page::MAX_LIMIT
            )));
        }
        let offset = (page_id - 1)
            .checked_mul(page_size)
            .ok_or_else(|| AppError::bad_request("page_id is too large"))?;
        Ok(Page::new(page_size, offset))
    }
}

pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Account>> {
    ok(state.ledger.list_accounts(&caller, query.page()?).await?)
}

pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Path(id): Path<i64>,
) -> ApiResult<Account> {
    ok(state.ledger.get_account(&caller, id).await?)
}

pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Entry>> {
    ok(state.ledger.list_entries(&caller, id, query.page()?).await?)
}

pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Transfer>> {
    ok(state.ledger.list_transfers(&caller, id, query.page()?).await?)
}

pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferResult> {
    ok(state.ledger.transfer(&caller, &req).await?)
}

pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Payload>,
    Path(id): Path<i64>,
) -> ApiResult<Transfer> {
    ok(state.ledger.get_transfer(&caller, id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_page_query() {
        let page = PageQuery::default().page().unwrap();
        assert_eq!(page, Page::new(10, 0));

        let page = PageQuery {
            page_id: Some(3),
            page_size: Some(5),
        }
        .page()
        .unwrap();
        assert_eq!(page, Page::new(5, 10));

        let err = PageQuery {
            page_id: Some(0),
            page_size: None,
        }
        .page()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = PageQuery {
            page_id: Some(i64::MAX / 2),
            page_size: Some(100),
        }
        .page()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = PageQuery {
            page_id: None,
            page_size: Some(1000),
        }
        .page()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
