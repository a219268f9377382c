use anyhow::{bail, Context, Result};

/// Minimum accepted length of the HS256 signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Front-end origin used to build the link embedded in verification emails.
    pub app_base_url: String,
    pub verification_ttl_secs: i64,
    pub brevo: Option<BrevoConfig>,
    /// Honour `X-Forwarded-For`; only set when running behind our own proxy.
    pub trust_proxy_headers: bool,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct BrevoConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let jwt_secret = require_env("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret,
            app_base_url: optional_env("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            verification_ttl_secs: optional_env("VERIFICATION_TTL_SECS")
                .unwrap_or_else(|| "86400".to_string())
                .parse::<i64>()
                .context("VERIFICATION_TTL_SECS must be an integer number of seconds")?,
            brevo: brevo_from_env(),
            trust_proxy_headers: optional_env("TRUST_PROXY_HEADERS")
                .map(|v| v.parse::<bool>())
                .transpose()
                .context("TRUST_PROXY_HEADERS must be true or false")?
                .unwrap_or(false),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Brevo is only enabled when both the key and the sender address are present.
fn brevo_from_env() -> Option<BrevoConfig> {
    Some(BrevoConfig {
        api_key: optional_env("BREVO_API_KEY")?,
        sender_email: optional_env("BREVO_SENDER_EMAIL")?,
        sender_name: optional_env("BREVO_SENDER_NAME"),
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
