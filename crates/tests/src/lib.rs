//! Integration tests for the Fırın storefront pipeline.
//!
//! This crate contains the cross-component test modules:
//!
//! - `router_tests`: matching precedence, 405/`Allow`, groups, base path
//! - `middleware_chain_tests`: ordering, short-circuits, CORS end to end
//! - `token_tests`: issue/verify/invalidate across service instances
//! - `rate_limit_tests`: window, blocking, and header behavior
//! - `validation_tests`: rulesets as the controllers declare them
//! - `end_to_end_tests`: the full router with mock stores; login flow,
//!   order status updates, contact intake
//! - `mock_stores`: reusable mock repositories with call counters
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! Everything runs in-process against the core router; no sockets, no
//! database files.


#[cfg(test)]
mod middleware_chain_tests;

#[cfg(test)]
mod rate_limit_tests;

#[cfg(test)]
mod router_tests;

#[cfg(test)]
mod token_tests;

#[cfg(test)]
mod validation_tests;

/// Mock stores shared by the test modules.
pub mod mock_stores;
