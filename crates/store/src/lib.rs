//! Persistence for the order-inventory engine.
//!
//! Two seams are defined here:
//! - [`StockStore`]: the product stock counter, mutated through atomic
//!   conditional adjustments
//! - [`OrderRepository`]: order documents with optimistic versioning
//!
//! Both have an in-memory implementation for tests and local runs, and a
//! PostgreSQL implementation.

pub mod error;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod stock;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderRepository, InMemoryStockStore};
pub use orders::OrderRepository;
pub use postgres::PostgresStore;
pub use stock::{AdjustOutcome, StockStore};
