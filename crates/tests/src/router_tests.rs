//! Router integration tests: middleware merge order, preflight fallback,
//! and dispatch behavior that spans components.

use async_trait::async_trait;
use firin_core::error::{AppError, ErrorBoundary};
use firin_core::http::{HttpRequest, HttpResponse, Method, RequestContext};
use firin_core::middleware::{Middleware, Next};
use firin_core::router::{handler_fn, Router};
use serde_json::json;
use std::sync::{Arc, Mutex};

struct Recorder {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Middleware for Recorder {
    async fn handle(
        &self,
        ctx: RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse, AppError> {
        self.log.lock().unwrap().push(self.label);
        next.run(ctx).await
    }
}

fn recorder(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn Middleware> {
    Arc::new(Recorder { label, log: log.clone() })
}

#[tokio::test]
async fn test_global_middleware_runs_before_route_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new(ErrorBoundary::new(false));

    router.global(recorder("global-1", &log));
    router.global(recorder("global-2", &log));
    router
        .register(
            Method::Get,
            "/test",
            handler_fn(|_ctx| async { Ok(HttpResponse::success(json!({}))) }),
        )
        .unwrap()
        .middleware(recorder("route", &log));

    let response = router.dispatch(HttpRequest::new(Method::Get, "/test")).await;

    assert_eq!(response.status, 200);
    assert_eq!(*log.lock().unwrap(), vec!["global-1", "global-2", "route"]);
}

#[tokio::test]
async fn test_group_middleware_precedes_route_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new(ErrorBoundary::new(false));

    let group_mw = recorder("group", &log);
    let route_mw = recorder("route", &log);
    router
        .group("/api", vec![group_mw], |r| {
            r.register(
                Method::Get,
                "/test",
                handler_fn(|_ctx| async { Ok(HttpResponse::no_content()) }),
            )?
            .middleware(route_mw.clone());
            Ok(())
        })
        .unwrap();

    router.dispatch(HttpRequest::new(Method::Get, "/api/test")).await;

    assert_eq!(*log.lock().unwrap(), vec!["group", "route"]);
}

#[tokio::test]
async fn test_preflight_runs_global_chain_for_routed_paths() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new(ErrorBoundary::new(false));

    router.global(recorder("global", &log));
    router
        .register(
            Method::Post,
            "/api/v1/iletisim",
            handler_fn(|_ctx| async { Ok(HttpResponse::no_content()) }),
        )
        .unwrap();

    // OPTIONS has no registered route, but the path routes under POST: the
    // global chain answers with 204 instead of a 405.
    let response = router
        .dispatch(HttpRequest::new(Method::Options, "/api/v1/iletisim"))
        .await;
    assert_eq!(response.status, 204);
    assert_eq!(*log.lock().unwrap(), vec!["global"]);

    // An OPTIONS against a path that routes nowhere is still a 404.
    let response = router
        .dispatch(HttpRequest::new(Method::Options, "/hic-yok"))
        .await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_middleware_error_skips_handler_and_renders() {
    struct Reject;

    #[async_trait]
    impl Middleware for Reject {
        async fn handle(
            &self,
            _ctx: RequestContext,
            _next: Next<'_>,
        ) -> Result<HttpResponse, AppError> {
            Err(firin_core::error::HttpError::forbidden("yasak").into())
        }
    }

    let handled = Arc::new(Mutex::new(false));
    let handled_in_route = handled.clone();

    let mut router = Router::new(ErrorBoundary::new(false));
    router.global(Arc::new(Reject));
    router
        .register(
            Method::Get,
            "/api/korumali",
            handler_fn(move |_ctx| {
                let handled = handled_in_route.clone();
                async move {
                    *handled.lock().unwrap() = true;
                    Ok(HttpResponse::no_content())
                }
            }),
        )
        .unwrap();

    let response = router
        .dispatch(HttpRequest::new(Method::Get, "/api/korumali"))
        .await;

    assert_eq!(response.status, 403);
    assert!(!*handled.lock().unwrap(), "handler must not run");
}

#[tokio::test]
async fn test_optional_parameter_routes() {
    let mut router = Router::new(ErrorBoundary::new(false));
    router
        .register(
            Method::Get,
            "/urunler/kategori/{slug}/{sayfa?}",
            handler_fn(|ctx: RequestContext| async move {
                Ok(HttpResponse::success(json!({
                    "slug": ctx.param("slug"),
                    "sayfa": ctx.param("sayfa"),
                })))
            }),
        )
        .unwrap();

    let without = router
        .dispatch(HttpRequest::new(Method::Get, "/urunler/kategori/ekmek"))
        .await;
    assert_eq!(without.status, 200);

    let with = router
        .dispatch(HttpRequest::new(Method::Get, "/urunler/kategori/ekmek/2"))
        .await;
    match &with.body {
        firin_core::http::ResponseBody::Json(v) => {
            assert_eq!(v["data"]["slug"], "ekmek");
            assert_eq!(v["data"]["sayfa"], "2");
        }
        other => panic!("expected JSON, got {other:?}"),
    }
}

#[tokio::test]
async fn test_query_string_not_part_of_matching() {
    // The server adapter splits the query off before dispatch; the router
    // only ever sees the path.
    let mut router = Router::new(ErrorBoundary::new(false));
    router
        .register(
            Method::Get,
            "/urunler",
            handler_fn(|ctx: RequestContext| async move {
                Ok(HttpResponse::success(json!({
                    "sayfa": ctx.request.query.get("sayfa"),
                })))
            }),
        )
        .unwrap();

    let response = router
        .dispatch(HttpRequest::new(Method::Get, "/urunler").with_query("sayfa", "3"))
        .await;

    assert_eq!(response.status, 200);
}
