//! Request middleware pipeline: CORS, authentication, and rate limiting.
//!
//! A middleware wraps the rest of the chain behind a [`Next`] continuation:
//!
//! ```text
//!   Incoming Request
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  1. CORS                │  preflight short-circuit, origin echo
//!   └─────────────────────────┘
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  2. RATE LIMITING       │  windowed counters per (action, IP)
//!   └─────────────────────────┘
//!        │ over the limit?
//!        ├─> 429 Too Many Requests (+ Retry-After)
//!        ▼
//!   ┌─────────────────────────┐
//!   │  3. AUTH                │  session cookie or bearer token
//!   └─────────────────────────┘
//!        │ no credential?
//!        ├─> 401 Unauthorized
//!        ▼
//!   ┌─────────────────────────┐
//!   │  4. HANDLER             │  controller business logic
//!   └─────────────────────────┘
//! ```
//!
//! Each layer may (a) call `next.run(ctx)` and return or post-process the
//! result, (b) return its own terminal response without calling `next`
//! (short-circuit), or (c) return a typed error. Composition is a right
//! fold: the first middleware in the list executes first and wraps all the
//! others.
//!
//! Middleware values are constructed once per configuration and shared
//! across requests; they hold no per-request state. The [`MiddlewareRegistry`]
//! maps stable names to those shared instances so route declarations can
//! reference middleware by name and a typo fails at startup.

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::{ApiAuthMiddleware, SessionAuthMiddleware};
pub use cors::{CorsConfig, CorsMiddleware};
pub use rate_limit::RateLimitMiddleware;

use crate::error::AppError;
use crate::http::{HttpResponse, RequestContext};
use crate::router::Handler;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A request interceptor. Implementations decide whether and how to invoke
/// the remainder of the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        ctx: RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse, AppError>;
}

impl std::fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<middleware>")
    }
}

/// The continuation handed to a middleware: the not-yet-run tail of the
/// chain plus the terminal handler.
pub struct Next<'a> {
    stack: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    #[must_use]
    pub fn new(stack: &'a [Arc<dyn Middleware>], handler: &'a dyn Handler) -> Self {
        Self { stack, handler }
    }

    /// Runs the rest of the chain. Consumes the continuation, so a
    /// middleware can invoke it at most once.
    ///
    /// # Errors
    /// Propagates whatever the downstream chain or handler fails with.
    pub async fn run(self, ctx: RequestContext) -> Result<HttpResponse, AppError> {
        match self.stack.split_first() {
            Some((head, tail)) => {
                head.handle(ctx, Next { stack: tail, handler: self.handler }).await
            }
            None => self.handler.call(ctx).await,
        }
    }
}

/// Name-to-instance registry for middleware, built once at startup.
///
/// Route declarations reference middleware by name; an unknown name is a
/// registration-time error rather than a silently skipped interceptor.
#[derive(Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, middleware: Arc<dyn Middleware>) {
        self.entries.insert(name.to_string(), middleware);
    }

    /// # Errors
    /// Returns the unknown name so the router can reject the route at
    /// registration.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Middleware>, String> {
        self.entries.get(name).cloned().ok_or_else(|| name.to_string())
    }
}
