//! The authenticated identity and its resolution strategies.
//!
//! Both credential paths (admin session cookie and API bearer token)
//! produce the same [`Principal`]. The [`PrincipalResolver`] picks the
//! strategy by which credential is present on the request, so identity
//! loading exists once instead of per credential kind.

use crate::auth::session::SessionStore;
use crate::auth::AuthError;
use crate::http::HttpRequest;
use crate::token::{bearer_token, Claims, TokenService};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// The authenticated identity attached to a request.
///
/// Derived per request from a verified credential, handed to handlers
/// read-only, and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub role: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl Principal {
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "role": self.role,
            "scopes": self.scopes,
        })
    }
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.user_id,
            username: claims.username.clone(),
            role: claims.role.clone(),
            scopes: claims.scopes.clone(),
        }
    }
}

/// Resolves a principal from whichever credential the request carries.
///
/// Bearer tokens win over session cookies when both are present (an API
/// client talking through the panel's origin is still an API client).
pub struct PrincipalResolver {
    tokens: Arc<TokenService>,
    sessions: Arc<dyn SessionStore>,
}

impl PrincipalResolver {
    #[must_use]
    pub fn new(tokens: Arc<TokenService>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { tokens, sessions }
    }

    /// Attempts resolution; `Ok(None)` means the request is anonymous,
    /// `Err` means a credential was presented but failed.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] for a bad token and
    /// [`AuthError::InvalidSession`] for a dead session.
    pub async fn resolve(&self, request: &HttpRequest) -> Result<Option<Principal>, AuthError> {
        if bearer_token(request).is_some() {
            let claims = self
                .tokens
                .require_auth(request)
                .await
                .map_err(|_| AuthError::InvalidCredentials)?;
            return Ok(Some(Principal::from(&claims)));
        }

        if let Some(session_id) = &request.session_id {
            let session = self
                .sessions
                .find(session_id)
                .await?
                .filter(|s| !s.is_expired())
                .ok_or(AuthError::InvalidSession)?;
            return Ok(Some(Principal {
                id: session.admin_id,
                username: session.username,
                role: session.role,
                scopes: Vec::new(),
            }));
        }

        Ok(None)
    }
}
