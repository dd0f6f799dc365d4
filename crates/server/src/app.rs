//! Service construction and route registration.
//!
//! Everything here runs once at startup: stores and the token service are
//! built from configuration, controllers are constructed with their
//! collaborators, middleware instances go into a named registry, and the
//! route table is declared. A typo in a pattern, a duplicate route, or an
//! unknown middleware name fails the boot, not a request.

use crate::handlers::{
    auth::AuthController, contact::ContactController, health, orders::OrdersController,
    panel::PanelController, products::ProductsController,
};
use firin_core::auth::repository::{SqliteUserRepository, UserRepository};
use firin_core::auth::session::{SessionStore, SqliteSessionStore};
use firin_core::config::AppConfig;
use firin_core::error::{AppError, ErrorBoundary};
use firin_core::http::{HttpResponse, Method, RequestContext};
use firin_core::middleware::{
    ApiAuthMiddleware, CorsMiddleware, MiddlewareRegistry, RateLimitMiddleware,
    SessionAuthMiddleware,
};
use firin_core::ratelimit::{CounterStore, RateLimiter, SqliteCounterStore};
use firin_core::router::{handler_fn, Handler, Router, RouterError};
use firin_core::storefront::{
    MessageRepository, OrderRepository, ProductRepository, SqliteMessageRepository,
    SqliteOrderRepository, SqliteProductRepository,
};
use firin_core::token::{SqliteTokenBlacklist, TokenBlacklist, TokenError, TokenService};
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Everything the handlers and middleware need, constructed once.
pub struct AppServices {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub tokens: Arc<TokenService>,
    pub blacklist: Arc<dyn TokenBlacklist>,
    pub counters: Arc<dyn CounterStore>,
    pub limiter: Arc<RateLimiter>,
}

impl AppServices {
    /// Builds the production service set over one `SQLite` pool.
    ///
    /// # Errors
    /// Fails when the token secret is missing, a fatal misconfiguration.
    pub fn from_sqlite(config: &AppConfig, pool: SqlitePool) -> Result<Self, TokenError> {
        let blacklist: Arc<dyn TokenBlacklist> =
            Arc::new(SqliteTokenBlacklist::new(pool.clone()));
        let counters: Arc<dyn CounterStore> = Arc::new(SqliteCounterStore::new(pool.clone()));

        let tokens = Arc::new(TokenService::new(
            &config.security.token_secret,
            config.security.token_lifetime_seconds,
            blacklist.clone(),
        )?);

        let limiter = Arc::new(RateLimiter::new(
            counters.clone(),
            config.rate_limit.actions.clone(),
            config.rate_limit.default,
        ));

        Ok(Self {
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            sessions: Arc::new(SqliteSessionStore::new(pool.clone())),
            orders: Arc::new(SqliteOrderRepository::new(pool.clone())),
            products: Arc::new(SqliteProductRepository::new(pool.clone())),
            messages: Arc::new(SqliteMessageRepository::new(pool)),
            tokens,
            blacklist,
            counters,
            limiter,
        })
    }

    /// Builds from explicitly supplied stores; used by tests and by any
    /// deployment that wants in-memory counters with a `SQLite` catalog.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_parts(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        messages: Arc<dyn MessageRepository>,
        tokens: Arc<TokenService>,
        blacklist: Arc<dyn TokenBlacklist>,
        counters: Arc<dyn CounterStore>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self { users, sessions, orders, products, messages, tokens, blacklist, counters, limiter }
    }

    /// Spawns the periodic garbage collection of blacklist entries, stale
    /// rate-limit counters, and expired sessions. Purging is an
    /// optimization, never a correctness requirement, so failures are
    /// logged and the loop continues.
    pub fn start_maintenance(&self, config: &AppConfig) {
        let blacklist = self.blacklist.clone();
        let counters = self.counters.clone();
        let sessions = self.sessions.clone();
        let default_policy = config.rate_limit.default;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));

            loop {
                interval.tick().await;

                match blacklist.purge_expired().await {
                    Ok(removed) if removed > 0 => {
                        debug!(removed, "purged expired blacklist entries");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "blacklist purge failed"),
                }

                match counters.purge_stale(chrono::Utc::now(), &default_policy).await {
                    Ok(removed) if removed > 0 => {
                        debug!(removed, "purged stale rate-limit counters");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "counter purge failed"),
                }

                match sessions.purge_expired().await {
                    Ok(removed) if removed > 0 => {
                        debug!(removed, "purged expired sessions");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "session purge failed"),
                }
            }
        });
    }
}

/// Adapts a controller method into a route handler: the controller is
/// captured once at registration, so dispatch is a clone of an `Arc` and a
/// method call; no construction on the hot path.
fn bind<C, F, Fut>(controller: &Arc<C>, method: F) -> Arc<dyn Handler>
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, AppError>> + Send + 'static,
{
    let controller = Arc::clone(controller);
    handler_fn(move |ctx| method(Arc::clone(&controller), ctx))
}

/// Builds the middleware registry: one shared instance per name, created
/// once per configuration.
fn build_middleware(config: &AppConfig, services: &AppServices) -> MiddlewareRegistry {
    let mut registry = MiddlewareRegistry::new();

    registry.insert("cors", Arc::new(CorsMiddleware::new(config.cors.clone())));
    registry.insert("api_auth", Arc::new(ApiAuthMiddleware::new(services.tokens.clone())));
    registry.insert(
        "session_auth",
        Arc::new(SessionAuthMiddleware::new(services.sessions.clone())),
    );
    for action in ["login", "contact", "api"] {
        registry.insert(
            &format!("throttle:{action}"),
            Arc::new(RateLimitMiddleware::new(services.limiter.clone(), action)),
        );
    }

    registry
}

/// Declares every route. The literal `/urunler/one-cikan` is registered
/// before `/urunler/{id}`: insertion order is the router's only precedence
/// rule.
///
/// # Errors
/// Any invalid pattern, duplicate route, or unknown middleware name.
pub fn build_router(config: &AppConfig, services: &AppServices) -> Result<Router, RouterError> {
    let registry = build_middleware(config, services);
    let resolve = |name: &str| registry.get(name).map_err(RouterError::UnknownMiddleware);

    let cors = resolve("cors")?;
    let api_auth = resolve("api_auth")?;
    let session_auth = resolve("session_auth")?;
    let throttle_login = resolve("throttle:login")?;
    let throttle_contact = resolve("throttle:contact")?;
    let throttle_api = resolve("throttle:api")?;

    let auth = AuthController::new(services.users.clone(), services.tokens.clone());
    let orders = OrdersController::new(services.orders.clone());
    let products = ProductsController::new(services.products.clone());
    let contact = ContactController::new(services.messages.clone());
    let panel = PanelController::new(services.orders.clone(), services.messages.clone());

    let mut router = Router::new(ErrorBoundary::new(config.security.debug))
        .with_base_path(&config.server.base_path)
        .with_api_prefix(&config.server.api_prefix);

    router.global(cors);

    router.register(Method::Get, "/health", handler_fn(health))?;

    // Public catalog.
    router
        .register(Method::Get, "/urunler", bind(&products, ProductsController::list))?
        .name("products");
    router
        .register(Method::Get, "/urunler/one-cikan", bind(&products, ProductsController::featured))?
        .name("products-featured");
    router
        .register(Method::Get, "/urunler/{id}", bind(&products, ProductsController::get))?
        .name("product-detail");

    // Admin panel (session cookie).
    router.group("/panel", vec![session_auth], |r| {
        r.register(Method::Get, "/ozet", bind(&panel, PanelController::summary))?;
        Ok(())
    })?;

    // JSON API.
    router.group("/api/v1", vec![throttle_api], |r| {
        r.group("/auth", vec![], |r| {
            r.register(Method::Post, "/login", bind(&auth, AuthController::login))?
                .middleware(throttle_login.clone())
                .name("login");
            r.register(Method::Post, "/logout", bind(&auth, AuthController::logout))?
                .middleware(api_auth.clone());
            r.register(Method::Post, "/refresh", bind(&auth, AuthController::refresh))?
                .middleware(api_auth.clone());
            r.register(Method::Get, "/me", bind(&auth, AuthController::me))?
                .middleware(api_auth.clone());
            Ok(())
        })?;

        r.group("/siparisler", vec![api_auth.clone()], |r| {
            r.register(Method::Get, "", bind(&orders, OrdersController::list))?;
            r.register(Method::Get, "/{id}", bind(&orders, OrdersController::get))?;
            r.register(
                Method::Patch,
                "/{id}/durum",
                bind(&orders, OrdersController::update_status),
            )?
            .name("order-status");
            Ok(())
        })?;

        r.register(Method::Post, "/iletisim", bind(&contact, ContactController::create))?
            .middleware(throttle_contact.clone());
        r.register(Method::Get, "/iletisim", bind(&contact, ContactController::list))?
            .middleware(api_auth.clone());

        Ok(())
    })?;

    info!("route table registered");
    Ok(router)
}
