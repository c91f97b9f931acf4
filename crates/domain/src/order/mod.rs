//! Order document, line items and the stock arithmetic around them.

mod commands;
mod diff;
mod model;
mod status;
mod value_objects;

pub use commands::{Checkout, ItemInput, NewOrder, OrderPatch};
pub use diff::{
    AdjustmentPlan, StockAdjustment, cancellation_plan, diff_items, plan_revision,
};
pub use model::Order;
pub use status::{OrderStatus, cancellation_delta, normalize_status};
pub use value_objects::{Money, OrderItem, order_total, validate_items};

use common::ProductId;
use thiserror::Error;

use crate::ErrorKind;

/// Errors raised while validating order input.
///
/// All of these are detected before any stock is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Delivery address is missing or blank.
    #[error("Delivery address is required")]
    AddressRequired,

    /// A line item does not reference a product.
    #[error("Line item {line} has no product reference")]
    MissingProduct { line: usize },

    /// Quantity is not a positive integer.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// Price is negative.
    #[error("Invalid price for {product_id}: {price} (must not be negative)")]
    InvalidPrice { product_id: ProductId, price: i64 },

    /// Status does not normalize to a canonical status.
    #[error("Invalid status: {0:?}")]
    InvalidStatus(String),

    /// quantity × unit_price of one line does not fit in i64 cents.
    #[error("Line total for {product_id} is too large")]
    LineTotalOverflow { product_id: ProductId },

    /// The order total does not fit in i64 cents.
    #[error("Order total is too large")]
    TotalOverflow,

    /// Client-declared total disagrees with the computed total.
    #[error("Total mismatch: declared {declared}, computed {computed}")]
    TotalMismatch { declared: Money, computed: Money },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::InvalidStatus(_) => ErrorKind::InvalidStatus,
            OrderError::TotalMismatch { .. } => ErrorKind::TotalMismatch,
            OrderError::NoItems
            | OrderError::AddressRequired
            | OrderError::MissingProduct { .. }
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. }
            | OrderError::LineTotalOverflow { .. }
            | OrderError::TotalOverflow => ErrorKind::ValidationError,
        }
    }
}
