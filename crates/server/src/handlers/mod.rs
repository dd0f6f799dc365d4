//! Controllers: the terminal business logic behind each route.
//!
//! Controllers are constructed once at startup with their collaborators and
//! registered as bound handlers; dispatch never instantiates anything.

pub mod auth;
pub mod contact;
pub mod orders;
pub mod panel;
pub mod products;

use firin_core::error::{AppError, HttpError};
use firin_core::http::{HttpResponse, RequestContext};
use serde_json::json;

/// Liveness probe.
pub async fn health(_ctx: RequestContext) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::json(
        200,
        json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    ))
}

/// Parses a numeric path parameter. Path params are raw strings; coercion
/// happens here, at the handler edge.
pub(crate) fn numeric_param(ctx: &RequestContext, name: &str) -> Result<i64, AppError> {
    ctx.param(name)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| HttpError::bad_request(format!("invalid {name} parameter")).into())
}
