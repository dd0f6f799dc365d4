//! Login, logout, token refresh, and the current-principal endpoint.
//!
//! Login is rate-limited by middleware before credentials are ever read.
//! Accounts with a TOTP secret must supply a valid `code`; the distinction
//! between "code missing" and "code wrong" is surfaced to the client (both
//! 401), but bad usernames and bad passwords are deliberately not
//! distinguishable.

use crate::audit;
use firin_core::auth::repository::UserRepository;
use firin_core::auth::totp;
use firin_core::auth::user::verify_password;
use firin_core::auth::AuthError;
use firin_core::error::AppError;
use firin_core::http::{HttpResponse, RequestContext};
use firin_core::token::{bearer_token, TokenService};
use firin_core::validation::{Rule, Ruleset};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct AuthController {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    login_rules: Ruleset,
}

impl AuthController {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Arc<Self> {
        let login_rules = Ruleset::new()
            .field("username", vec![Rule::Required, Rule::Str, Rule::Max(64.0)])
            .field("password", vec![Rule::Required, Rule::Str, Rule::Max(128.0)])
            .field("code", vec![Rule::Nullable, Rule::Str]);

        Arc::new(Self { users, tokens, login_rules })
    }

    /// `POST /api/v1/auth/login`
    pub async fn login(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        let ip = ctx.request.client_ip;
        let validated = self.login_rules.validate(&ctx.request.body_object())?;
        let username = validated.get("username").and_then(Value::as_str).unwrap_or_default();
        let password = validated.get("password").and_then(Value::as_str).unwrap_or_default();

        let Some(user) = self.users.find_by_username(username).await? else {
            audit::log_login_failed(username, ip);
            return Err(AuthError::InvalidCredentials.into());
        };

        if !user.is_active {
            audit::log_login_failed(username, ip);
            return Err(AuthError::InactiveAccount.into());
        }

        if !verify_password(password, &user.password_hash) {
            audit::log_login_failed(username, ip);
            return Err(AuthError::InvalidCredentials.into());
        }

        if user.two_factor_enabled() {
            let code = validated.get("code").and_then(Value::as_str).unwrap_or_default();
            if code.is_empty() {
                return Err(AuthError::TwoFactorRequired.into());
            }
            let secret = user.totp_secret.as_deref().unwrap_or_default();
            if !totp::verify(secret, code, chrono::Utc::now().timestamp()) {
                audit::log_login_failed(username, ip);
                return Err(AuthError::InvalidTwoFactorCode.into());
            }
        }

        self.users.record_login(user.id).await?;
        let issued = self.tokens.issue(user.id, &user.username, &user.role, user.scopes());
        audit::log_login(&user.username, ip);

        Ok(HttpResponse::success(json!({
            "token": issued.token,
            "token_type": "Bearer",
            "expires_in": issued.expires_in,
        })))
    }

    /// `POST /api/v1/auth/logout`: blacklists the presented token.
    pub async fn logout(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        let principal = ctx.require_principal()?.clone();
        let token = bearer_token(&ctx.request)
            .ok_or_else(|| firin_core::error::HttpError::unauthorized("unauthorized"))?;

        self.tokens.invalidate(token).await?;
        audit::log_logout(&principal.username, ctx.request.client_ip);

        Ok(HttpResponse::success_message("logged out"))
    }

    /// `POST /api/v1/auth/refresh`: invalidates the old token, issues a
    /// fresh one with the same identity and scopes.
    pub async fn refresh(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        let principal = ctx.require_principal()?.clone();
        let token = bearer_token(&ctx.request)
            .ok_or_else(|| firin_core::error::HttpError::unauthorized("unauthorized"))?;

        self.tokens.invalidate(token).await?;
        let issued = self.tokens.issue(
            principal.id,
            &principal.username,
            &principal.role,
            principal.scopes.clone(),
        );

        Ok(HttpResponse::success(json!({
            "token": issued.token,
            "token_type": "Bearer",
            "expires_in": issued.expires_in,
        })))
    }

    /// `GET /api/v1/auth/me`
    pub async fn me(self: Arc<Self>, ctx: RequestContext) -> Result<HttpResponse, AppError> {
        let principal = ctx.require_principal()?;
        Ok(HttpResponse::success(principal.to_json()))
    }
}
