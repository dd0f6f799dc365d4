//! Authentication middleware: session-based for the admin panel,
//! bearer-token-based for the API.
//!
//! Both attach the resolved [`crate::principal::Principal`] to the request
//! context before delegating, so handlers and later middleware can perform
//! role and scope checks without touching credentials again.

use super::{Middleware, Next};
use crate::auth::session::SessionStore;
use crate::auth::AuthError;
use crate::error::AppError;
use crate::http::{HttpResponse, RequestContext};
use crate::principal::Principal;
use crate::token::TokenService;
use async_trait::async_trait;
use std::sync::Arc;

/// Requires an active, unexpired admin session with a non-empty admin id.
pub struct SessionAuthMiddleware {
    sessions: Arc<dyn SessionStore>,
}

impl SessionAuthMiddleware {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Middleware for SessionAuthMiddleware {
    async fn handle(
        &self,
        mut ctx: RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse, AppError> {
        let session_id = ctx
            .request
            .session_id
            .clone()
            .filter(|sid| !sid.is_empty())
            .ok_or(AuthError::InvalidSession)?;

        let session = self
            .sessions
            .find(&session_id)
            .await?
            .filter(|session| !session.is_expired() && session.admin_id > 0)
            .ok_or(AuthError::InvalidSession)?;

        ctx.principal = Some(Principal {
            id: session.admin_id,
            username: session.username,
            role: session.role,
            scopes: Vec::new(),
        });

        next.run(ctx).await
    }
}

/// Requires a valid, non-blacklisted, non-expired bearer token.
pub struct ApiAuthMiddleware {
    tokens: Arc<TokenService>,
}

impl ApiAuthMiddleware {
    #[must_use]
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Middleware for ApiAuthMiddleware {
    async fn handle(
        &self,
        mut ctx: RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse, AppError> {
        let claims = self.tokens.require_auth(&ctx.request).await.map_err(|e| {
            tracing::warn!(error = %e, path = %ctx.request.path, "api authentication failed");
            AppError::from(e)
        })?;

        ctx.principal = Some(Principal::from(&claims));

        next.run(ctx).await
    }
}
