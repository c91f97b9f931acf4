//! Engine error types.

use common::{OrderId, ProductId, UserId};
use domain::{ErrorKind, OrderError};
use store::StoreError;
use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request failed validation or normalization.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A consumption adjustment could not be satisfied.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A line item references a product the stock store does not know.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The principal may not perform the action.
    #[error("User {user_id} is not allowed to {action}")]
    Forbidden {
        user_id: UserId,
        action: &'static str,
    },

    /// Reverting already-applied adjustments failed; stock may be off.
    #[error("Stock compensation failed for {product_id}: {reason}")]
    CompensationFailed {
        product_id: ProductId,
        reason: String,
    },

    /// Units freed by a committed order write could not be returned.
    #[error("Stock release failed for {product_id}: {reason}")]
    ReleaseFailed {
        product_id: ProductId,
        reason: String,
    },

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Machine-readable category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Order(e) => e.kind(),
            EngineError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            EngineError::ProductNotFound(_) | EngineError::OrderNotFound(_) => ErrorKind::NotFound,
            EngineError::Forbidden { .. } => ErrorKind::Forbidden,
            EngineError::CompensationFailed { .. } | EngineError::ReleaseFailed { .. } => {
                ErrorKind::Internal
            }
            EngineError::Store(e) => match e {
                StoreError::ConcurrencyConflict { .. } | StoreError::DuplicateOrder(_) => {
                    ErrorKind::Conflict
                }
                StoreError::OrderNotFound(_) => ErrorKind::NotFound,
                StoreError::InvalidStock { .. } => ErrorKind::ValidationError,
                _ => ErrorKind::Internal,
            },
        }
    }
}
