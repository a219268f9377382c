use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Message returned for every failed verification, whatever the cause.
pub const VERIFICATION_FAILED_MESSAGE: &str = "Verification link is invalid or expired.";

/// Why a verification attempt failed. Internal only: every variant renders
/// the same 401 body so callers cannot probe account state.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification token invalid or expired")]
    TokenInvalid,

    #[error("no unverified user matched the token subject")]
    NotFoundOrAlreadyVerified,

    #[error("user store fault: {0}")]
    StoreFault(#[from] StoreError),
}

impl VerificationError {
    /// Log tag distinguishing the failure kind server-side.
    pub fn tag(&self) -> &'static str {
        match self {
            VerificationError::TokenInvalid => "token_invalid",
            VerificationError::NotFoundOrAlreadyVerified => "not_found_or_verified",
            VerificationError::StoreFault(_) => "store_fault",
        }
    }
}

impl IntoResponse for VerificationError {
    fn into_response(self) -> Response {
        // The body never depends on the variant.
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "message": VERIFICATION_FAILED_MESSAGE
            })),
        )
            .into_response()
    }
}
