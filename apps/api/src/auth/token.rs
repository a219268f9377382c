//! HS256 verification tokens.
//!
//! Tokens are compact JWTs (`header.payload.signature`, base64url without
//! padding). Only HS256 is accepted; the signature is checked with
//! `Hmac::verify_slice` before the payload is parsed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

/// Value of the `purpose` claim on email-verification tokens.
pub const EMAIL_VERIFICATION_PURPOSE: &str = "email_verification";

/// Why a token was rejected. Never shown to callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not three dot-separated segments")]
    Format,

    #[error("invalid base64url segment")]
    Encoding,

    #[error("unsupported token header")]
    Header,

    #[error("signature mismatch")]
    Signature,

    #[error("invalid token payload: {0}")]
    Payload(String),

    #[error("token expired")]
    Expired,

    #[error("token issued for a different purpose")]
    Purpose,

    #[error("signing key rejected")]
    Key,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

/// Claims carried by a verification token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationClaims {
    /// User id.
    pub sub: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
    pub purpose: String,
}

impl VerificationClaims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|e| TokenError::Payload(format!("subject: {e}")))
    }
}

/// Issues and validates verification tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs a token for `user_id` valid for `ttl_secs` from `now` (unix seconds).
    pub fn issue(&self, user_id: Uuid, now: i64, ttl_secs: i64) -> Result<String, TokenError> {
        let claims = VerificationClaims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
            purpose: EMAIL_VERIFICATION_PURPOSE.to_string(),
        };
        self.encode(&claims)
    }

    fn encode(&self, claims: &VerificationClaims) -> Result<String, TokenError> {
        let header = JwtHeader {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| TokenError::Payload(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(claims).map_err(|e| TokenError::Payload(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.mac(&signing_input)?.finalize().into_bytes();

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Validates signature, expiry and purpose, returning the claims.
    pub fn verify(&self, token: &str, now: i64) -> Result<VerificationClaims, TokenError> {
        let token = token.replace(char::is_whitespace, "");
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Format);
        };

        let header: JwtHeader =
            serde_json::from_slice(&b64url_decode(header_b64)?).map_err(|_| TokenError::Header)?;
        if header.alg != "HS256" || !header.typ.eq_ignore_ascii_case("JWT") {
            return Err(TokenError::Header);
        }

        let signature = b64url_decode(sig_b64)?;
        self.mac(&format!("{header_b64}.{payload_b64}"))?
            .verify_slice(&signature)
            .map_err(|_| TokenError::Signature)?;

        let claims: VerificationClaims = serde_json::from_slice(&b64url_decode(payload_b64)?)
            .map_err(|e| TokenError::Payload(e.to_string()))?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.purpose != EMAIL_VERIFICATION_PURPOSE {
            return Err(TokenError::Purpose);
        }
        claims.user_id()?;

        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<Hmac<Sha256>, TokenError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret).map_err(|_| TokenError::Key)?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn b64url_decode(segment: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| TokenError::Encoding)
}
