//! Middleware composition tests across the built-in variants.
//!
//! These validate ordering and interaction between the layers as they are
//! stacked in production: CORS → rate limiting → auth → handler.

use firin_core::error::ErrorBoundary;
use firin_core::http::{HttpRequest, HttpResponse, Method, RequestContext, ResponseBody};
use firin_core::middleware::{
    ApiAuthMiddleware, CorsConfig, CorsMiddleware, Middleware, RateLimitMiddleware,
};
use firin_core::ratelimit::{MemoryCounterStore, RateLimitPolicy, RateLimiter};
use firin_core::router::{handler_fn, Router};
use firin_core::token::{MemoryTokenBlacklist, TokenService};
use serde_json::json;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

fn cors() -> Arc<dyn Middleware> {
    Arc::new(CorsMiddleware::new(CorsConfig {
        allowed_origins: vec!["https://firin.example".to_string()],
        ..CorsConfig::default()
    }))
}

fn tokens() -> Arc<TokenService> {
    Arc::new(
        TokenService::new("chain-test-secret", 3600, Arc::new(MemoryTokenBlacklist::new()))
            .unwrap(),
    )
}

fn limiter(max_hits: u32) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(
        Arc::new(MemoryCounterStore::new()),
        HashMap::new(),
        RateLimitPolicy::new(max_hits, 60, 300),
    ))
}

/// The production stack in miniature: CORS global, throttle + auth on the
/// route, a handler that echoes the principal.
fn stacked_router(limiter: Arc<RateLimiter>, tokens: Arc<TokenService>) -> Router {
    let mut router = Router::new(ErrorBoundary::new(false));
    router.global(cors());
    router
        .register(
            Method::Get,
            "/api/korumali",
            handler_fn(|ctx: RequestContext| async move {
                let principal = ctx.require_principal()?;
                Ok(HttpResponse::success(json!({ "user": principal.username })))
            }),
        )
        .unwrap()
        .middleware(Arc::new(RateLimitMiddleware::new(limiter, "api")))
        .middleware(Arc::new(ApiAuthMiddleware::new(tokens)));
    router
}

fn client(last_octet: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 99, 0, last_octet))
}

#[tokio::test]
async fn test_full_stack_happy_path() {
    let tokens = tokens();
    let issued = tokens.issue(1, "ayse", "admin", vec![]);
    let router = stacked_router(limiter(10), tokens);

    let response = router
        .dispatch(
            HttpRequest::new(Method::Get, "/api/korumali")
                .with_client_ip(client(1))
                .with_header("Origin", "https://firin.example")
                .with_header("Authorization", format!("Bearer {}", issued.token)),
        )
        .await;

    assert_eq!(response.status, 200);
    // Every layer left its mark: CORS echo, rate-limit headers, payload.
    assert_eq!(
        response.header("Access-Control-Allow-Origin"),
        Some("https://firin.example")
    );
    assert_eq!(response.header("X-RateLimit-Limit"), Some("10"));
    match &response.body {
        ResponseBody::Json(v) => assert_eq!(v["data"]["user"], "ayse"),
        other => panic!("expected JSON, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_fires_before_auth() {
    // One request per window: the second request must be rejected with 429,
    // not 401, even though it also lacks a token.
    let router = stacked_router(limiter(1), tokens());

    let first = router
        .dispatch(HttpRequest::new(Method::Get, "/api/korumali").with_client_ip(client(2)))
        .await;
    assert_eq!(first.status, 401, "authorized layer rejects after throttle passes");

    let second = router
        .dispatch(HttpRequest::new(Method::Get, "/api/korumali").with_client_ip(client(2)))
        .await;
    assert_eq!(second.status, 429, "throttle rejects before auth is consulted");
}

#[tokio::test]
async fn test_auth_failure_renders_through_boundary() {
    // A 401 from deep in the chain propagates past CORS to the boundary;
    // the rendered error is a well-formed JSON envelope.
    let router = stacked_router(limiter(10), tokens());

    let response = router
        .dispatch(
            HttpRequest::new(Method::Get, "/api/korumali")
                .with_client_ip(client(3))
                .with_header("Origin", "https://firin.example"),
        )
        .await;

    assert_eq!(response.status, 401);
    match &response.body {
        ResponseBody::Json(v) => assert_eq!(v["success"], false),
        other => panic!("expected JSON, got {other:?}"),
    }
}

#[tokio::test]
async fn test_preflight_never_consumes_rate_limit() {
    let limiter = limiter(2);
    let router = stacked_router(limiter.clone(), tokens());

    for _ in 0..5 {
        let response = router
            .dispatch(
                HttpRequest::new(Method::Options, "/api/korumali")
                    .with_client_ip(client(4))
                    .with_header("Origin", "https://firin.example"),
            )
            .await;
        assert_eq!(response.status, 204);
    }

    // Five preflights later the client still has its full budget.
    let status = limiter.check("api", &client(4).to_string()).await.unwrap();
    assert_eq!(status.remaining, 2);
}

#[tokio::test]
async fn test_expired_token_rejected_by_stack() {
    let tokens = Arc::new(
        TokenService::new("chain-test-secret", -10, Arc::new(MemoryTokenBlacklist::new()))
            .unwrap(),
    );
    let issued = tokens.issue(1, "ayse", "admin", vec![]);
    let router = stacked_router(limiter(10), tokens);

    let response = router
        .dispatch(
            HttpRequest::new(Method::Get, "/api/korumali")
                .with_client_ip(client(5))
                .with_header("Authorization", format!("Bearer {}", issued.token)),
        )
        .await;

    assert_eq!(response.status, 401);
}
