//! `DomainError` → HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::json;

pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::NotFound(..) => StatusCode::NOT_FOUND,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            DomainError::AlreadyOwned(_) => StatusCode::CONFLICT,
            DomainError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self.0, "storage failure surfaced to client");
        }
        (status, Json(json!({ "ok": false, "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
