//! Cross-origin resource sharing.
//!
//! Preflight (`OPTIONS`) requests always short-circuit with an empty 204;
//! `next` is never invoked for them. On every response the allowed-methods,
//! allowed-headers, max-age, and (if configured) credentials headers are
//! set, but `Access-Control-Allow-Origin` is only set when the request's
//! `Origin` exactly matches an allow-list entry or a `*.domain` wildcard
//! anchored to the same scheme. There is no `*` fallback: a non-matching
//! origin simply gets no origin header.

use super::{Middleware, Next};
use crate::error::AppError;
use crate::http::{HttpResponse, Method, RequestContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// CORS settings, sourced from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins (`https://shop.example`) or scheme-anchored wildcards
    /// (`https://*.example.com`).
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,

    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,

    #[serde(default = "default_max_age_seconds")]
    pub max_age_seconds: u64,

    #[serde(default)]
    pub allow_credentials: bool,
}

fn default_allowed_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_allowed_headers() -> Vec<String> {
    ["Content-Type", "Authorization", "Accept"].iter().map(ToString::to_string).collect()
}

fn default_max_age_seconds() -> u64 {
    86400
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
            max_age_seconds: default_max_age_seconds(),
            allow_credentials: false,
        }
    }
}

pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    #[must_use]
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Whether `origin` matches the allow-list, either exactly or via a
    /// `scheme://*.domain` wildcard. Wildcards match subdomains only, never
    /// the bare domain, and the scheme must agree.
    fn origin_allowed(&self, origin: &str) -> bool {
        self.config.allowed_origins.iter().any(|entry| {
            if entry == origin {
                return true;
            }

            let (Some((entry_scheme, entry_host)), Some((origin_scheme, origin_host))) =
                (entry.split_once("://"), origin.split_once("://"))
            else {
                return false;
            };

            entry_scheme == origin_scheme &&
                entry_host
                    .strip_prefix("*.")
                    .is_some_and(|domain| {
                        origin_host
                            .strip_suffix(domain)
                            .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
                    })
        })
    }

    fn apply_headers(&self, mut response: HttpResponse, origin: Option<&str>) -> HttpResponse {
        if let Some(origin) = origin {
            response.set_header("Access-Control-Allow-Origin", origin);
            // Caches must not serve one origin's response to another.
            response.set_header("Vary", "Origin");
        }
        response.set_header(
            "Access-Control-Allow-Methods",
            self.config.allowed_methods.join(", "),
        );
        response.set_header(
            "Access-Control-Allow-Headers",
            self.config.allowed_headers.join(", "),
        );
        response.set_header("Access-Control-Max-Age", self.config.max_age_seconds.to_string());
        if self.config.allow_credentials {
            response.set_header("Access-Control-Allow-Credentials", "true");
        }
        response
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn handle(
        &self,
        ctx: RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse, AppError> {
        let origin = ctx
            .request
            .header("origin")
            .filter(|o| self.origin_allowed(o))
            .map(ToString::to_string);

        if ctx.request.method == Method::Options {
            return Ok(self.apply_headers(HttpResponse::no_content(), origin.as_deref()));
        }

        let response = next.run(ctx).await?;
        Ok(self.apply_headers(response, origin.as_deref()))
    }
}
