//! Route registration and dispatch.
//!
//! The router is an explicit value constructed once at startup and owned by
//! the request entry point; there is no global instance, and tests build an
//! isolated router per case. Handlers are trait objects resolved at
//! registration time: a controller is constructed once and registers bound
//! closures, so dispatch never instantiates anything.
//!
//! Matching is deliberately simple: the first registered route (in insertion
//! order) whose compiled pattern matches the path wins. There is no
//! specificity ordering, so a literal route that must beat a parameterized
//! sibling (`/urunler/one-cikan` vs `/urunler/{id}`) is registered first.
//! Duplicate (method, pattern) registrations are rejected at startup instead
//! of silently shadowing.
//!
//! Dispatch resolves the route, merges global middleware ahead of the
//! route's own, and runs the chain with the handler as the innermost
//! continuation. Every failure, typed errors and handler panics alike,
//! is rendered by the [`ErrorBoundary`], so a request always produces a
//! well-formed response.

mod pattern;

use crate::error::{AppError, ErrorBoundary, HttpError};
use crate::http::{HttpRequest, HttpResponse, Method, RequestContext};
use crate::middleware::{Middleware, Next};
use futures::FutureExt;
use pattern::CompiledPattern;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Route registration errors. All of these are startup failures; none can
/// occur during dispatch.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("duplicate route: {method} {pattern}")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unknown middleware: {0}")]
    UnknownMiddleware(String),
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, AppError>> + Send>>;

/// A terminal route handler.
///
/// Implemented for any `Fn(RequestContext) -> impl Future`, which covers
/// free functions and controller-bound closures alike.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: RequestContext) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, AppError>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        Box::pin(self(ctx))
    }
}

/// Wraps a closure or free function as a shared handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, AppError>> + Send + 'static,
{
    Arc::new(f)
}

struct Route {
    method: Method,
    pattern: String,
    compiled: CompiledPattern,
    handler: Arc<dyn Handler>,
    middleware: Vec<Arc<dyn Middleware>>,
    name: Option<String>,
}

/// Borrowed view of a just-registered route, for attaching middleware and a
/// name fluently.
pub struct RouteHandle<'a> {
    router: &'a mut Router,
    index: usize,
}

impl RouteHandle<'_> {
    #[must_use]
    pub fn middleware(self, middleware: Arc<dyn Middleware>) -> Self {
        self.router.routes[self.index].middleware.push(middleware);
        self
    }

    #[must_use]
    pub fn name(self, name: &str) -> Self {
        self.router.routes[self.index].name = Some(name.to_string());
        self
    }
}

pub struct Router {
    routes: Vec<Route>,
    global: Vec<Arc<dyn Middleware>>,
    registered: HashSet<(Method, String)>,
    boundary: ErrorBoundary,
    base_path: String,
    api_prefix: String,
    group_prefix: String,
    group_middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    #[must_use]
    pub fn new(boundary: ErrorBoundary) -> Self {
        Self {
            routes: Vec::new(),
            global: Vec::new(),
            registered: HashSet::new(),
            boundary,
            base_path: String::new(),
            api_prefix: "/api".to_string(),
            group_prefix: String::new(),
            group_middleware: Vec::new(),
        }
    }

    /// Prefix stripped from every inbound URI before matching (deployments
    /// under a sub-path).
    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = base_path.trim_end_matches('/').to_string();
        self
    }

    /// Path prefix under which errors are rendered as JSON regardless of the
    /// `Accept` header.
    #[must_use]
    pub fn with_api_prefix(mut self, api_prefix: &str) -> Self {
        self.api_prefix = api_prefix.to_string();
        self
    }

    /// Appends middleware that runs for every route, ahead of route-specific
    /// middleware, in registration order.
    pub fn global(&mut self, middleware: Arc<dyn Middleware>) {
        self.global.push(middleware);
    }

    /// Registers a route. The pattern is joined onto the active group
    /// prefix; the route inherits the active group middleware.
    ///
    /// # Errors
    /// Rejects invalid patterns and duplicate (method, pattern) pairs.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<RouteHandle<'_>, RouterError> {
        let full_pattern = join_paths(&self.group_prefix, pattern);
        let compiled = CompiledPattern::compile(&full_pattern)?;

        let key = (method, full_pattern.clone());
        if !self.registered.insert(key) {
            return Err(RouterError::DuplicateRoute { method, pattern: full_pattern });
        }
        self.routes.push(Route {
            method,
            pattern: full_pattern,
            compiled,
            handler,
            middleware: self.group_middleware.clone(),
            name: None,
        });

        let index = self.routes.len() - 1;
        Ok(RouteHandle { router: self, index })
    }

    /// Runs `f` with `prefix` appended to the group prefix and `middleware`
    /// appended to the group middleware, restoring both afterwards, also
    /// when `f` fails, so a bad route inside a group cannot leak group state
    /// into later registrations.
    ///
    /// # Errors
    /// Propagates registration errors from `f`.
    pub fn group<F>(
        &mut self,
        prefix: &str,
        middleware: Vec<Arc<dyn Middleware>>,
        f: F,
    ) -> Result<(), RouterError>
    where
        F: FnOnce(&mut Self) -> Result<(), RouterError>,
    {
        let saved_prefix = self.group_prefix.clone();
        let saved_middleware_len = self.group_middleware.len();

        self.group_prefix = join_paths(&self.group_prefix, prefix);
        self.group_middleware.extend(middleware);

        let result = f(self);

        self.group_prefix = saved_prefix;
        self.group_middleware.truncate(saved_middleware_len);

        result
    }

    /// The registered pattern for a named route, for link generation.
    #[must_use]
    pub fn route_pattern(&self, name: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| route.name.as_deref() == Some(name))
            .map(|route| route.pattern.as_str())
    }

    /// Dispatches a request to completion. Never fails: every error path
    /// ends in the boundary, which always produces a response.
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let wants_json = request.wants_json(&self.api_prefix);

        match self.try_dispatch(request).await {
            Ok(response) => response,
            Err(err) => self.boundary.render(&err, wants_json),
        }
    }

    async fn try_dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse, AppError> {
        let path = self.normalize_path(&request.path);
        request.path = path.clone();

        // First pattern match in insertion order wins; other-method matches
        // are collected for the 405 Allow header.
        let mut matched = None;
        let mut allowed: Vec<Method> = Vec::new();
        for route in &self.routes {
            if let Some(params) = route.compiled.matches(&path) {
                if route.method == request.method {
                    matched = Some((route, params));
                    break;
                }
                if !allowed.contains(&route.method) {
                    allowed.push(route.method);
                }
            }
        }

        let Some((route, params)) = matched else {
            // Preflight is answered from the global chain (CORS) for any
            // path that routes at all; it never reaches auth or handlers.
            if request.method == Method::Options && !allowed.is_empty() {
                let ctx = RequestContext::new(request);
                let fallback = preflight_fallback;
                let next = Next::new(&self.global, &fallback);
                return self.run_guarded(next, ctx).await;
            }

            if allowed.is_empty() {
                return Err(HttpError::not_found("not found").into());
            }
            allowed.sort_unstable();
            return Err(HttpError::method_not_allowed(allowed).into());
        };

        let mut ctx = RequestContext::new(request);
        ctx.params = params;

        let chain: Vec<Arc<dyn Middleware>> = self
            .global
            .iter()
            .chain(route.middleware.iter())
            .cloned()
            .collect();
        let next = Next::new(&chain, route.handler.as_ref());
        self.run_guarded(next, ctx).await
    }

    /// Runs a chain with a panic guard, so a panicking handler degrades to a
    /// 500 through the boundary instead of tearing down the worker.
    async fn run_guarded(
        &self,
        next: Next<'_>,
        ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(AppError::internal(format!("handler panicked: {message}")))
            }
        }
    }

    /// Strips the configured base path and normalizes trailing slashes.
    /// The query string is already separated by the server adapter.
    fn normalize_path(&self, path: &str) -> String {
        let path = path.strip_prefix(self.base_path.as_str()).unwrap_or(path);
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        }
    }
}

fn preflight_fallback(_ctx: RequestContext) -> HandlerFuture {
    Box::pin(async { Ok(HttpResponse::no_content()) })
}

fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{prefix}/{path}")
    }
}
