//! Order–inventory consistency engine.
//!
//! The [`OrderService`] keeps product stock equal to the net effect of all
//! non-cancelled order items. Every operation follows the same shape:
//!
//! 1. Validate and normalize the request (no side effects)
//! 2. Plan per-product stock adjustments with the item diff engine
//! 3. Reserve the consumptions through the [`StockAdjustmentExecutor`], all
//!    or nothing
//! 4. Persist the order, reverting the reservations if that fails
//! 5. Return released units to stock once the write has committed

pub mod error;
pub mod executor;
pub mod service;

pub use error::EngineError;
pub use executor::{AdjustmentReport, AppliedAdjustment, StockAdjustmentExecutor};
pub use service::OrderService;
