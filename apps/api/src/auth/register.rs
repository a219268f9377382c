//! Registration and verification-link resend.
//!
//! Both flows answer identically whether or not the address is known, so the
//! endpoints cannot be used to enumerate accounts.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::auth::origin::ClientOrigin;
use crate::auth::store::UserStore;
use crate::auth::token::TokenCodec;
use crate::errors::AppError;
use crate::mail_client::VerificationMailer;
use crate::models::user::{is_plausible_email, normalize_email, UserRecord};

pub const VERIFICATION_SENT_MESSAGE: &str =
    "If the address can be verified, a verification email has been sent.";

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AcceptedResponse {
    pub success: bool,
    pub message: &'static str,
}

impl AcceptedResponse {
    pub fn verification_sent() -> Self {
        Self {
            success: true,
            message: VERIFICATION_SENT_MESSAGE,
        }
    }
}

/// Everything needed to mint and deliver a verification link.
pub struct LinkIssuer<'a> {
    pub codec: &'a TokenCodec,
    pub mailer: &'a dyn VerificationMailer,
    pub app_base_url: &'a str,
    pub ttl_secs: i64,
}

impl LinkIssuer<'_> {
    pub fn link_for(&self, token: &str) -> String {
        format!("{}/verify/{token}", self.app_base_url)
    }

    /// Issues a token for `user` and mails the link. Failures are logged, not returned.
    async fn deliver(&self, user: &UserRecord, now: i64) {
        let token = match self.codec.issue(user.id, now, self.ttl_secs) {
            Ok(token) => token,
            Err(e) => {
                error!(user_id = %user.id, "Failed to issue verification token: {e}");
                return;
            }
        };
        let link = self.link_for(&token);
        match self.mailer.send_verification(&user.email, &link).await {
            Ok(()) => info!(user_id = %user.id, "Verification email dispatched"),
            Err(e) => error!(user_id = %user.id, "Failed to send verification email: {e}"),
        }
    }
}

fn validated_email(raw: &str) -> Result<String, AppError> {
    let email = normalize_email(raw);
    if !is_plausible_email(&email) {
        return Err(AppError::Validation(
            "email must be a valid address".to_string(),
        ));
    }
    Ok(email)
}

/// Creates an unverified account and mails its verification link.
/// An already-registered address gets no mail and the same response.
pub async fn register(
    raw_email: &str,
    store: &dyn UserStore,
    issuer: &LinkIssuer<'_>,
    origin: &ClientOrigin,
    now: i64,
) -> Result<AcceptedResponse, AppError> {
    let email = validated_email(raw_email)?;

    match store.create_unverified(&email).await {
        Ok(Some(user)) => {
            info!(user_id = %user.id, %origin, "Registered unverified user");
            issuer.deliver(&user, now).await;
        }
        Ok(None) => info!(%origin, "Registration for an existing address ignored"),
        Err(e) => error!(%origin, "Registration failed: {e}"),
    }

    Ok(AcceptedResponse::verification_sent())
}

/// Re-sends a link to a registered, still-unverified address.
pub async fn resend_verification(
    raw_email: &str,
    store: &dyn UserStore,
    issuer: &LinkIssuer<'_>,
    origin: &ClientOrigin,
    now: i64,
) -> Result<AcceptedResponse, AppError> {
    let email = validated_email(raw_email)?;

    match store.find_unverified_by_email(&email).await {
        Ok(Some(user)) => issuer.deliver(&user, now).await,
        Ok(None) => info!(%origin, "Resend requested for unknown or verified address"),
        Err(e) => error!(%origin, "Resend lookup failed: {e}"),
    }

    Ok(AcceptedResponse::verification_sent())
}
