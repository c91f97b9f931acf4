use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was modified since it was read.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: u64,
        actual: u64,
    },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with the same id is already stored.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// A stock level below zero was requested.
    #[error("Invalid stock level for {product_id}: {stock}")]
    InvalidStock { product_id: ProductId, stock: i64 },

    /// Applying the adjustment would overflow the stock counter.
    #[error("Stock counter for {product_id} would overflow: {stock} + {delta}")]
    StockOverflow {
        product_id: ProductId,
        stock: i64,
        delta: i64,
    },

    /// A stored order could not be decoded.
    #[error("Corrupt order record {order_id}: {reason}")]
    CorruptRecord { order_id: OrderId, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
