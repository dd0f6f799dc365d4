//! Error taxonomy and the process-wide error boundary.
//!
//! Every failure in the pipeline is one of three kinds: a validation failure
//! (422, always carries the field map), an explicit HTTP error with a status,
//! or an unexpected internal failure (500). All of them propagate unmodified
//! to the single [`ErrorBoundary`], which is the only place responses are
//! formatted and failures are logged.

use crate::http::{HttpResponse, Method};
use crate::validation::ValidationErrors;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// An expected failure with a specific HTTP status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
    /// Seconds until the client may retry; rendered as `Retry-After` on 429.
    pub retry_after: Option<u64>,
    /// Permitted methods; rendered as `Allow` on 405.
    pub allow: Option<Vec<Method>>,
}

impl HttpError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), retry_after: None, allow: None }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    #[must_use]
    pub fn method_not_allowed(allow: Vec<Method>) -> Self {
        Self { allow: Some(allow), ..Self::new(405, "method not allowed") }
    }

    #[must_use]
    pub fn too_many_requests(retry_after: u64) -> Self {
        Self { retry_after: Some(retry_after), ..Self::new(429, "too many requests") }
    }
}

/// Any failure a request can produce.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Http(#[from] HttpError),

    /// Programming errors, I/O failures, panics: anything unexpected.
    /// The message is logged but never shown to production clients.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::Http(e) => e.status,
            Self::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(format!("database error: {err}"))
    }
}

/// The single catch-all that turns an [`AppError`] into a well-formed
/// response and a log entry.
///
/// 4xx-class errors log at `warn`, everything else at `error`. In production
/// the response carries a fixed user-safe message per status; debug mode is
/// an explicit opt-in that surfaces the real message. Validation field maps
/// are never considered sensitive and are included in both modes.
#[derive(Debug, Clone)]
pub struct ErrorBoundary {
    debug: bool,
}

impl ErrorBoundary {
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Formats `err` as JSON or HTML depending on the request context.
    /// This function never fails.
    #[must_use]
    pub fn render(&self, err: &AppError, wants_json: bool) -> HttpResponse {
        let status = err.status();

        if status >= 500 {
            error!(status, kind = error_kind(err), message = %err, "request failed");
        } else {
            warn!(status, kind = error_kind(err), message = %err, "request rejected");
        }

        let mut response = if wants_json {
            self.render_json(err, status)
        } else {
            self.render_html(err, status)
        };

        if let AppError::Http(http) = err {
            if let Some(retry_after) = http.retry_after {
                response.set_header("Retry-After", retry_after.to_string());
            }
            if let Some(allow) = &http.allow {
                let methods: Vec<&str> = allow.iter().map(Method::as_str).collect();
                response.set_header("Allow", methods.join(", "));
            }
        }

        response
    }

    fn render_json(&self, err: &AppError, status: u16) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "error": self.client_message(err, status),
        });

        if let AppError::Validation(errors) = err {
            body["errors"] = errors.to_json();
        }

        HttpResponse::json(status, body)
    }

    fn render_html(&self, err: &AppError, status: u16) -> HttpResponse {
        let message = self.client_message(err, status);
        let page = format!(
            "<!DOCTYPE html>\n<html lang=\"tr\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{status}</title>\n</head>\n<body>\n<h1>{status}</h1>\n<p>{message}</p>\n\
             </body>\n</html>\n"
        );
        HttpResponse::html(status, page)
    }

    /// The message shown to the client. Explicit HTTP errors and validation
    /// failures are already user-safe; internal errors are masked unless
    /// debug mode is on.
    fn client_message(&self, err: &AppError, status: u16) -> String {
        match err {
            AppError::Internal(message) if self.debug => message.clone(),
            AppError::Internal(_) => safe_message(status).to_string(),
            AppError::Validation(_) => "validation failed".to_string(),
            AppError::Http(http) => http.message.clone(),
        }
    }
}

fn error_kind(err: &AppError) -> &'static str {
    match err {
        AppError::Validation(_) => "validation",
        AppError::Http(_) => "http",
        AppError::Internal(_) => "internal",
    }
}

fn safe_message(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not found",
        405 => "method not allowed",
        422 => "validation failed",
        429 => "too many requests",
        503 => "service unavailable",
        _ => "internal server error",
    }
}
