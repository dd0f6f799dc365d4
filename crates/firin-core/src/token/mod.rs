//! Bearer-token issuance, verification, and invalidation.
//!
//! Tokens are three base64url segments (`header.claims.signature`) signed
//! with HMAC-SHA256 over the first two. Each token carries a unique `jti`;
//! logout records that id in a blacklist so a not-yet-expired token can be
//! rejected immediately. Blacklist entries become dead weight once the
//! token's own expiry has passed (`verify` checks expiry first) and are
//! purged opportunistically, not as a correctness requirement.
//!
//! Verification order: structure, signature, expiry, blacklist. A malformed
//! token is a typed error, never a panic.

pub mod blacklist;

pub use blacklist::{MemoryTokenBlacklist, SqliteTokenBlacklist, TokenBlacklist};

use crate::error::{AppError, HttpError};
use crate::http::HttpRequest;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by token handling.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No signing secret configured. Fatal misconfiguration at startup,
    /// never a per-request condition.
    #[error("token signing secret is not configured")]
    MissingSecret,

    /// Wrong number of segments or undecodable header/claims.
    #[error("malformed token")]
    Malformed,

    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    /// The token's `jti` is blacklisted (logged out before expiry).
    #[error("token revoked")]
    Revoked,

    #[error("no bearer token in request")]
    MissingToken,

    #[error("blacklist storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for TokenError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret | TokenError::Storage(_) => {
                Self::Internal(err.to_string())
            }
            _ => Self::Http(HttpError::unauthorized("unauthorized")),
        }
    }
}

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Unique token id; the revocation handle.
    pub jti: String,
}

impl Claims {
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// A freshly issued token with its decoded claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    /// Seconds until expiry, for the login response body.
    pub expires_in: i64,
}

/// Issues and verifies signed bearer tokens.
pub struct TokenService {
    key: hmac::Key,
    lifetime: Duration,
    blacklist: Arc<dyn TokenBlacklist>,
}

impl TokenService {
    /// # Errors
    /// Returns [`TokenError::MissingSecret`] when the secret is empty;
    /// callers should treat that as fatal at startup.
    pub fn new(
        secret: &str,
        lifetime_seconds: i64,
        blacklist: Arc<dyn TokenBlacklist>,
    ) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }

        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            lifetime: Duration::seconds(lifetime_seconds),
            blacklist,
        })
    }

    /// Issues a token for an authenticated identity. The `jti` is a fresh
    /// UUID, `iat` is now, and `exp` is now plus the configured lifetime.
    #[must_use]
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        role: &str,
        scopes: Vec<String>,
    ) -> IssuedToken {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            role: role.to_string(),
            scopes,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = TokenHeader { alg: "HS256".to_string(), typ: "JWT".to_string() };
        let header_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header).expect("token header serialization cannot fail"),
        );
        let claims_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims).expect("claims serialization cannot fail"),
        );

        let signed_part = format!("{header_b64}.{claims_b64}");
        let signature = hmac::sign(&self.key, signed_part.as_bytes());
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature.as_ref());

        let expires_in = self.lifetime.num_seconds();
        IssuedToken { token: format!("{signed_part}.{signature_b64}"), claims, expires_in }
    }

    /// Verifies a token end to end: structure, signature, expiry, blacklist.
    ///
    /// # Errors
    /// Returns the first failing check as a [`TokenError`].
    pub async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode_signed(token)?;

        if Utc::now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        if self.blacklist.contains(&claims.jti).await? {
            return Err(TokenError::Revoked);
        }

        Ok(claims)
    }

    /// Blacklists a token's `jti` until the token's own expiry.
    ///
    /// The token must be structurally sound and correctly signed, but expiry
    /// is deliberately not checked: blacklisting an already expired token is
    /// a harmless no-op, and logout should not fail on it.
    ///
    /// # Errors
    /// Fails on malformed/forged tokens and on blacklist storage errors.
    pub async fn invalidate(&self, token: &str) -> Result<(), TokenError> {
        let claims = self.decode_signed(token)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .unwrap_or_else(Utc::now);
        self.blacklist.insert(&claims.jti, expires_at).await
    }

    /// Extracts and verifies the bearer token from the `Authorization`
    /// header.
    ///
    /// # Errors
    /// Returns [`TokenError::MissingToken`] when the header is absent or not
    /// a bearer credential, otherwise whatever [`Self::verify`] reports.
    pub async fn require_auth(&self, request: &HttpRequest) -> Result<Claims, TokenError> {
        let token = bearer_token(request).ok_or(TokenError::MissingToken)?;
        self.verify(token).await
    }

    /// Decodes the segments and checks the signature; no expiry or blacklist
    /// checks.
    fn decode_signed(&self, token: &str) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header_bytes =
            URL_SAFE_NO_PAD.decode(header_b64).map_err(|_| TokenError::Malformed)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature =
            URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| TokenError::Malformed)?;
        let signed_part = &token[..header_b64.len() + 1 + claims_b64.len()];
        hmac::verify(&self.key, signed_part.as_bytes(), &signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims_bytes =
            URL_SAFE_NO_PAD.decode(claims_b64).map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed)
    }
}

/// The raw bearer credential from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(request: &HttpRequest) -> Option<&str> {
    let header = request.header("authorization")?;
    let token = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
