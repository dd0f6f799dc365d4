//! Conversion between `axum` requests/responses and the core HTTP values.
//!
//! A single fallback handler feeds every inbound request into the core
//! router; `axum` contributes the listener, the tower layers (body limit,
//! compression, concurrency), and connection info, while all routing
//! decisions happen in `firin-core`.

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use firin_core::http::{HttpRequest, HttpResponse, Method, ResponseBody};
use firin_core::router::Router;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use url::form_urlencoded;

/// Name of the admin session cookie.
pub const SESSION_COOKIE: &str = "firin_session";

/// Shared state for the axum fallback handler.
pub struct ServerState {
    pub router: Router,
}

/// The single axum handler: converts, dispatches, converts back.
pub async fn dispatch(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let Some(method) = Method::parse(parts.method.as_str()) else {
        // HEAD, TRACE and friends are not routed by this application.
        return plain_status(StatusCode::METHOD_NOT_ALLOWED);
    };

    let mut core_request = HttpRequest::new(method, parts.uri.path());
    core_request.client_ip = addr.ip();
    core_request.query = parse_query(parts.uri.query().unwrap_or(""));

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            core_request.insert_header(name.as_str(), value);
        }
    }

    core_request.session_id = parts
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(session_cookie);

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return plain_status(StatusCode::BAD_REQUEST),
    };

    if !bytes.is_empty() {
        let content_type = core_request.header("content-type").unwrap_or("").to_string();
        if content_type.contains("application/json") {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => core_request.body = Some(value),
                Err(e) => {
                    tracing::warn!(error = %e, "malformed JSON body");
                    return malformed_body_response();
                }
            }
        } else if content_type.contains("application/x-www-form-urlencoded") {
            let mut map = Map::new();
            for (key, value) in form_urlencoded::parse(&bytes) {
                map.insert(key.into_owned(), Value::String(value.into_owned()));
            }
            core_request.body = Some(Value::Object(map));
        }
    }

    into_axum(state.router.dispatch(core_request).await)
}

fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Extracts the session id from a `Cookie` header.
fn session_cookie(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

fn plain_status(status: StatusCode) -> Response {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

fn malformed_body_response() -> Response {
    let body = serde_json::json!({ "success": false, "error": "malformed JSON body" });
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static("application/json"));
    response
}

/// Converts a core response into an axum response. `Content-Type` is derived
/// from the body variant; invalid header names/values are skipped rather
/// than failing the response.
pub fn into_axum(response: HttpResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let (body, content_type) = match &response.body {
        ResponseBody::Json(value) => (Body::from(value.to_string()), Some("application/json")),
        ResponseBody::Html(page) => (Body::from(page.clone()), Some("text/html; charset=utf-8")),
        ResponseBody::Empty => (Body::empty(), None),
    };

    let mut axum_response = Response::new(body);
    *axum_response.status_mut() = status;

    if let Some(content_type) = content_type {
        axum_response
            .headers_mut()
            .insert("content-type", HeaderValue::from_static(content_type));
    }

    for (name, value) in response.headers() {
        let (Ok(name), Ok(value)) =
            (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str()))
        else {
            tracing::warn!(header = %name, "skipping invalid response header");
            continue;
        };
        axum_response.headers_mut().insert(name, value);
    }

    axum_response
}
