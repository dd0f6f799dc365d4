//! HTTP adapter for the Fırın storefront pipeline.
//!
//! The binary wires `axum` onto the framework-independent core: every
//! inbound request is converted to a [`firin_core::http::HttpRequest`],
//! dispatched through the core [`firin_core::router::Router`], and the
//! resulting [`firin_core::http::HttpResponse`] is converted back. Route
//! and middleware registration lives in [`app`], the controllers in
//! [`handlers`].

pub mod app;
pub mod audit;
pub mod bridge;
pub mod handlers;
