//! Email verification — one atomic `Unverified → Verified` transition per token.
//!
//! Every failure collapses into `VerificationError`, whose response body is the
//! same for all variants. The distinguishing detail only reaches the log.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::auth::origin::ClientOrigin;
use crate::auth::store::UserStore;
use crate::auth::token::TokenCodec;
use crate::errors::VerificationError;
use crate::models::user::UserRecord;

pub const VERIFICATION_SUCCESS_MESSAGE: &str = "User verified successfully.";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct VerificationResponse {
    pub success: bool,
    pub message: &'static str,
}

impl VerificationResponse {
    pub fn verified() -> Self {
        Self {
            success: true,
            message: VERIFICATION_SUCCESS_MESSAGE,
        }
    }
}

/// Validates `token` and marks its user verified.
///
/// 1. Decode and check the token (signature, expiry, purpose, subject).
/// 2. Run the store's conditional update for the subject.
/// 3. `None` from the store means unknown user or already verified; both fail.
///
/// Nothing is retried. `now` is unix seconds.
pub async fn verify_email(
    token: &str,
    codec: &TokenCodec,
    store: &dyn UserStore,
    origin: &ClientOrigin,
    now: i64,
) -> Result<UserRecord, VerificationError> {
    let user_id = match codec.verify(token, now).and_then(|claims| claims.user_id()) {
        Ok(user_id) => user_id,
        Err(e) => {
            let err = VerificationError::TokenInvalid;
            debug!(reason = %e, "verification token rejected");
            warn!(kind = err.tag(), %origin, "Verification token invalid or expired");
            return Err(err);
        }
    };

    match store.conditional_verify(user_id).await {
        Ok(Some(user)) => {
            info!(%user_id, %origin, "User verified successfully");
            Ok(user)
        }
        Ok(None) => {
            let err = VerificationError::NotFoundOrAlreadyVerified;
            warn!(kind = err.tag(), %user_id, %origin, "No unverified user for verification token");
            Err(err)
        }
        Err(e) => {
            let err = VerificationError::StoreFault(e);
            error!(kind = err.tag(), %user_id, %origin, error = %err, "Verification update failed");
            Err(err)
        }
    }
}
