mod auth;
mod config;
mod db;
mod errors;
mod mail_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::store::PgUserStore;
use crate::auth::token::TokenCodec;
use crate::config::Config;
use crate::db::create_pool;
use crate::mail_client::{BrevoMailer, LogMailer, VerificationMailer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume verification API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize mailer
    let mailer: Arc<dyn VerificationMailer> = match &config.brevo {
        Some(brevo) => {
            info!("Brevo mailer initialized (sender: {})", brevo.sender_email);
            Arc::new(BrevoMailer::new(brevo.clone())?)
        }
        None => {
            info!("Brevo not configured; verification links will be logged");
            Arc::new(LogMailer)
        }
    };

    // Build app state
    let state = AppState {
        users: Arc::new(PgUserStore::new(db)),
        tokens: TokenCodec::new(config.jwt_secret.clone()),
        mailer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to APP_BASE_URL once the front end is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
