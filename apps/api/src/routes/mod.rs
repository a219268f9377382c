pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth API
        .route("/api/v1/auth/register", post(handlers::handle_register))
        .route(
            "/api/v1/auth/verification/resend",
            post(handlers::handle_resend_verification),
        )
        .route(
            "/api/v1/auth/verify/:verification_token",
            get(handlers::handle_verify_email),
        )
        .with_state(state)
}
