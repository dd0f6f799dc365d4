//! Windowed rate limiting with temporary blocking.
//!
//! Counters are fixed-window: a key gets `max_hits` hits per `window_seconds`
//! window; crossing the threshold sets a block that outlives the window: a
//! blocked identifier stays rejected for the whole block duration even
//! though a fresh window would otherwise have reset its counter.
//!
//! The counter update is the one place in the system that needs explicit
//! concurrency discipline: two simultaneous requests must not both observe
//! the last free slot. The [`store::CounterStore`] implementations serialize
//! the read-modify-write (`DashMap` entry locking in memory, an immediate
//! transaction in `SQLite`); the window transition itself is the pure
//! [`advance`] function shared by both.

pub mod store;

pub use store::{CounterStore, MemoryCounterStore, SqliteCounterStore};

use crate::error::{AppError, HttpError};
use crate::http::HttpResponse;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("counter storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RateLimitError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Limits for one named action. Values come from configuration, not code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Hits allowed inside one window.
    pub max_hits: u32,
    /// Window length in seconds.
    pub window_seconds: i64,
    /// Block duration applied when the threshold is crossed.
    pub block_seconds: i64,
}

impl RateLimitPolicy {
    #[must_use]
    pub fn new(max_hits: u32, window_seconds: i64, block_seconds: i64) -> Self {
        Self { max_hits, window_seconds, block_seconds }
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.window_seconds)
    }
}

/// Persistent counter state for one (action, identifier) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub hits: u32,
    pub window_start: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

/// Outcome of a `check` or `hit`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    /// Seconds until the client may try again; present only when denied.
    pub retry_after: Option<u64>,
}

/// Applies one hit to a counter. Pure; every store funnels its atomic
/// read-modify-write through this so the transition semantics exist once.
///
/// Order matters: an active block wins over everything (including window
/// expiry), then an elapsed window restarts the count, then the hit lands
/// and may trip the block.
#[must_use]
pub fn advance(previous: Option<Counter>, now: DateTime<Utc>, policy: &RateLimitPolicy) -> Counter {
    if let Some(counter) = previous {
        if counter.blocked_until.is_some_and(|until| until > now) {
            return counter;
        }

        if now < counter.window_start + policy.window() {
            let hits = counter.hits.saturating_add(1);
            let blocked_until = (hits > policy.max_hits)
                .then(|| now + Duration::seconds(policy.block_seconds));
            return Counter { hits, window_start: counter.window_start, blocked_until };
        }
    }

    Counter { hits: 1, window_start: now, blocked_until: None }
}

fn status_after_hit(counter: &Counter, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateLimitStatus {
    let blocked = counter.blocked_until.is_some_and(|until| until > now);
    let allowed = !blocked && counter.hits <= policy.max_hits;
    let reset_at = counter
        .blocked_until
        .filter(|until| *until > now)
        .unwrap_or(counter.window_start + policy.window());

    RateLimitStatus {
        allowed,
        limit: policy.max_hits,
        remaining: policy.max_hits.saturating_sub(counter.hits),
        reset_at,
        retry_after: (!allowed).then(|| seconds_until(reset_at, now)),
    }
}

#[allow(clippy::cast_sign_loss)]
fn seconds_until(at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (at - now).num_seconds().max(1) as u64
}

/// Informational values for `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}

impl RateLimitHeaders {
    /// Attaches the informational headers. When limiters nest (a generic API
    /// limit around a per-action one), the innermost limiter has already set
    /// its headers by the time the outer one unwinds; the more specific
    /// values are kept.
    #[must_use]
    pub fn apply(&self, mut response: HttpResponse) -> HttpResponse {
        if response.header("X-RateLimit-Limit").is_some() {
            return response;
        }
        response.set_header("X-RateLimit-Limit", self.limit.to_string());
        response.set_header("X-RateLimit-Remaining", self.remaining.to_string());
        response.set_header("X-RateLimit-Reset", self.reset.to_string());
        response
    }
}

/// Per-action, per-identifier rate limiter over a [`CounterStore`].
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policies: HashMap<String, RateLimitPolicy>,
    default_policy: RateLimitPolicy,
}

impl RateLimiter {
    #[must_use]
    pub fn new(
        store: Arc<dyn CounterStore>,
        policies: HashMap<String, RateLimitPolicy>,
        default_policy: RateLimitPolicy,
    ) -> Self {
        Self { store, policies, default_policy }
    }

    #[must_use]
    pub fn policy(&self, action: &str) -> &RateLimitPolicy {
        self.policies.get(action).unwrap_or(&self.default_policy)
    }

    fn key(action: &str, identifier: &str) -> String {
        format!("{action}:{identifier}")
    }

    /// Read-only view of the current state; never increments.
    ///
    /// # Errors
    /// Propagates counter storage failures.
    pub async fn check(
        &self,
        action: &str,
        identifier: &str,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let policy = self.policy(action);
        let now = Utc::now();

        let Some(counter) = self.store.peek(&Self::key(action, identifier)).await? else {
            return Ok(RateLimitStatus {
                allowed: true,
                limit: policy.max_hits,
                remaining: policy.max_hits,
                reset_at: now + policy.window(),
                retry_after: None,
            });
        };

        if counter.blocked_until.is_some_and(|until| until > now) {
            let reset_at = counter.blocked_until.unwrap_or(now);
            return Ok(RateLimitStatus {
                allowed: false,
                limit: policy.max_hits,
                remaining: 0,
                reset_at,
                retry_after: Some(seconds_until(reset_at, now)),
            });
        }

        if now >= counter.window_start + policy.window() {
            return Ok(RateLimitStatus {
                allowed: true,
                limit: policy.max_hits,
                remaining: policy.max_hits,
                reset_at: now + policy.window(),
                retry_after: None,
            });
        }

        let allowed = counter.hits < policy.max_hits;
        let reset_at = counter.window_start + policy.window();
        Ok(RateLimitStatus {
            allowed,
            limit: policy.max_hits,
            remaining: policy.max_hits.saturating_sub(counter.hits),
            reset_at,
            retry_after: (!allowed).then(|| seconds_until(reset_at, now)),
        })
    }

    /// Registers one hit atomically and reports the post-hit state.
    ///
    /// # Errors
    /// Propagates counter storage failures.
    pub async fn hit(
        &self,
        action: &str,
        identifier: &str,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let policy = self.policy(action);
        let now = Utc::now();
        let counter = self.store.apply_hit(&Self::key(action, identifier), now, policy).await?;
        Ok(status_after_hit(&counter, now, policy))
    }

    /// The middleware entry point: one atomic hit, a 429 with `retry_after`
    /// when the limit is exceeded, otherwise the informational header values.
    ///
    /// # Errors
    /// Returns a 429 [`HttpError`] on rejection; internal errors on storage
    /// failure.
    pub async fn enforce(
        &self,
        action: &str,
        identifier: &str,
    ) -> Result<RateLimitHeaders, AppError> {
        let status = self.hit(action, identifier).await?;

        if !status.allowed {
            tracing::warn!(action, identifier, "rate limit exceeded");
            return Err(HttpError::too_many_requests(status.retry_after.unwrap_or(1)).into());
        }

        Ok(RateLimitHeaders {
            limit: status.limit,
            remaining: status.remaining,
            reset: status.reset_at.timestamp(),
        })
    }
}
