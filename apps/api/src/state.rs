use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::origin::ProxyTrust;
use crate::auth::store::UserStore;
use crate::auth::token::TokenCodec;
use crate::config::Config;
use crate::mail_client::VerificationMailer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable user store. Default: PgUserStore over the shared pool.
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenCodec,
    /// Brevo when configured, otherwise the log mailer.
    pub mailer: Arc<dyn VerificationMailer>,
    pub config: Config,
}

impl FromRef<AppState> for ProxyTrust {
    fn from_ref(state: &AppState) -> Self {
        ProxyTrust(state.config.trust_proxy_headers)
    }
}
