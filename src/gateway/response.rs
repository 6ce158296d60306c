use std::error::Error as _;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};

/// Response envelope: `code` is 0 on success, `data` is absent on error
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

pub mod error_codes {
    use crate::error::ErrorKind;

    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const NOT_FOUND: i32 = 1004;
    pub const CONFLICT: i32 = 1009;

    // Auth errors (2xxx)
    pub const AUTH_FAILED: i32 = 2002;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5003;

    pub fn for_kind(kind: ErrorKind) -> i32 {
        match kind {
            ErrorKind::BadRequest => INVALID_PARAMETER,
            ErrorKind::NotFound => NOT_FOUND,
            ErrorKind::Conflict => CONFLICT,
            ErrorKind::Unauthorized => AUTH_FAILED,
            ErrorKind::Internal => INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let msg = if self.is(ErrorKind::Internal) {
            let cause = self.source().map(|s| s.to_string()).unwrap_or_default();
            tracing::error!(error = %self, cause = %cause, "Request failed");
            "internal server error".to_string()
        } else {
            self.message().to_string()
        };

        let body = ApiResponse::<()>::error(error_codes::for_kind(self.kind()), msg);
        (status, Json(body)).into_response()
    }
}
