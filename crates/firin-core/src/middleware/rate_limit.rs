//! Rate-limit middleware for a named action.
//!
//! One atomic check-and-increment per request, keyed by (action, client IP).
//! Over the threshold the request is rejected with 429 and a `Retry-After`
//! hint before `next` runs; otherwise the informational `X-RateLimit-*`
//! headers are attached to the downstream response.

use super::{Middleware, Next};
use crate::error::AppError;
use crate::http::{HttpResponse, RequestContext};
use crate::ratelimit::RateLimiter;
use async_trait::async_trait;
use std::sync::Arc;

pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
    action: String,
}

impl RateLimitMiddleware {
    #[must_use]
    pub fn new(limiter: Arc<RateLimiter>, action: &str) -> Self {
        Self { limiter, action: action.to_string() }
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        ctx: RequestContext,
        next: Next<'_>,
    ) -> Result<HttpResponse, AppError> {
        let identifier = ctx.request.client_ip.to_string();
        let headers = self.limiter.enforce(&self.action, &identifier).await?;

        let response = next.run(ctx).await?;
        Ok(headers.apply(response))
    }
}
