//! Domain layer for the order-inventory consistency engine.
//!
//! This crate is free of I/O. It provides:
//! - The order document and its line items
//! - Status normalization and the cancellation-transition delta
//! - The item diff engine producing per-product stock adjustments

pub mod error;
pub mod order;

pub use common::{OrderId, ProductId, UserId};
pub use error::ErrorKind;
pub use order::{
    AdjustmentPlan, Checkout, ItemInput, Money, NewOrder, Order, OrderError, OrderItem,
    OrderPatch, OrderStatus, StockAdjustment, cancellation_delta, cancellation_plan, diff_items,
    normalize_status, order_total, plan_revision, validate_items,
};
