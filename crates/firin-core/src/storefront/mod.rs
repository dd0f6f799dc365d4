//! Storefront data collaborators: products, orders, contact messages.
//!
//! The pipeline treats these as external row stores reached through
//! parameterized queries; schema and migrations live outside this crate.
//! Each store is a trait (mockable in tests) with a `SQLite` implementation.

pub mod models;
pub mod repository;

pub use models::{ContactMessage, Order, OrderStatus, Product};
pub use repository::{
    MessageRepository, OrderRepository, ProductRepository, SqliteMessageRepository,
    SqliteOrderRepository, SqliteProductRepository, StoreError,
};
