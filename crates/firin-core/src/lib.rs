//! # Fırın Core
//!
//! Core library for the Fırın storefront's request pipeline.
//!
//! This crate provides the foundational components for:
//!
//! - **[`router`]**: Route registration and dispatch with `{param}` patterns,
//!   insertion-order matching, 405/`Allow` handling, and route groups.
//!
//! - **[`middleware`]**: The interceptor chain (CORS, session auth, bearer
//!   auth, rate limiting) composed as a right fold around the handler.
//!
//! - **[`token`]**: HMAC-SHA256 bearer tokens with jti-based invalidation
//!   through a pluggable blacklist store.
//!
//! - **[`ratelimit`]**: Fixed-window counters with temporary blocking,
//!   keyed by (action, client identifier).
//!
//! - **[`validation`]**: Declarative per-field rulesets with whitelist
//!   output and field-keyed error maps.
//!
//! - **[`error`]**: The error taxonomy and the single boundary that turns
//!   every failure into a well-formed JSON or HTML response.
//!
//! - **[`auth`]**: Admin accounts (Argon2id passwords, TOTP second factor),
//!   sessions, and their `SQLite` stores.
//!
//! - **[`principal`]**: One authenticated identity resolved from either
//!   credential kind.
//!
//! - **[`storefront`]**: Product/order/message collaborators behind
//!   repository traits.
//!
//! - **[`config`]**: Layered configuration with startup validation.
//!
//! ## Request Flow
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────┐
//! │   Router    │ ─── no route ──► 404 / 405 (+Allow)
//! └──────┬──────┘
//!        │ matched
//!        ▼
//! ┌─────────────┐
//! │ Middleware  │ ─── CORS preflight ──► 204
//! │   Chain     │ ─── rate limited ────► 429 (+Retry-After)
//! │             │ ─── unauthenticated ─► 401
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  Handler    │ ─── ValidationErrors ──► 422 (+field map)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   Error     │  every failure, including panics,
//! │  Boundary   │  becomes a well-formed response
//! └─────────────┘
//! ```
//!
//! The crate is framework-independent: the `server` crate adapts a real
//! HTTP stack onto [`http::HttpRequest`] / [`http::HttpResponse`].

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod principal;
pub mod ratelimit;
pub mod router;
pub mod storefront;
pub mod token;
pub mod validation;
