use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::warn;

use crate::auth::origin::ClientOrigin;
use crate::auth::register::{
    register, resend_verification, AcceptedResponse, EmailRequest, LinkIssuer,
};
use crate::auth::verify::{verify_email, VerificationResponse};
use crate::errors::{AppError, VerificationError};
use crate::state::AppState;

fn link_issuer(state: &AppState) -> LinkIssuer<'_> {
    LinkIssuer {
        codec: &state.tokens,
        mailer: state.mailer.as_ref(),
        app_base_url: &state.config.app_base_url,
        ttl_secs: state.config.verification_ttl_secs,
    }
}

/// GET /api/v1/auth/verify/:verification_token
///
/// A segment the router cannot decode is just another invalid token.
pub async fn handle_verify_email(
    State(state): State<AppState>,
    origin: ClientOrigin,
    verification_token: Result<Path<String>, PathRejection>,
) -> Result<Json<VerificationResponse>, VerificationError> {
    let Path(verification_token) = verification_token.map_err(|rejection| {
        let err = VerificationError::TokenInvalid;
        warn!(kind = err.tag(), %origin, reason = %rejection, "Undecodable verification token");
        err
    })?;

    verify_email(
        &verification_token,
        &state.tokens,
        state.users.as_ref(),
        &origin,
        Utc::now().timestamp(),
    )
    .await?;
    Ok(Json(VerificationResponse::verified()))
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    origin: ClientOrigin,
    Json(req): Json<EmailRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    let response = register(
        &req.email,
        state.users.as_ref(),
        &link_issuer(&state),
        &origin,
        Utc::now().timestamp(),
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /api/v1/auth/verification/resend
pub async fn handle_resend_verification(
    State(state): State<AppState>,
    origin: ClientOrigin,
    Json(req): Json<EmailRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    let response = resend_verification(
        &req.email,
        state.users.as_ref(),
        &link_issuer(&state),
        &origin,
        Utc::now().timestamp(),
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}
