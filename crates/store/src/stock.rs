use async_trait::async_trait;
use common::ProductId;

use crate::Result;

/// Result of a single conditional stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustOutcome {
    /// The product matched and its stock was modified.
    Applied { stock: i64 },

    /// The product matched but holds fewer units than the decrement needs.
    Insufficient { available: i64 },

    /// No product with this id exists.
    UnknownProduct,
}

impl AdjustOutcome {
    /// Returns true if the adjustment matched and modified a product.
    pub fn is_applied(&self) -> bool {
        matches!(self, AdjustOutcome::Applied { .. })
    }
}

/// The stock counter of catalog products.
///
/// Implementations must perform [`adjust`](StockStore::adjust) as one atomic
/// read-modify-write so that concurrent callers can never drive a counter
/// below zero.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Adds `delta` to the product's stock.
    ///
    /// A negative delta is applied only if the current stock covers it;
    /// positive deltas apply to an existing product unless the counter would
    /// overflow, which is a [`StoreError::StockOverflow`](crate::StoreError::StockOverflow).
    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<AdjustOutcome>;

    /// Returns the current stock, or None if the product is unknown.
    async fn stock(&self, product_id: &ProductId) -> Result<Option<i64>>;

    /// Overwrites the stock counter, creating the product row if needed.
    ///
    /// Used by catalog restocking. Negative values are rejected.
    async fn set_stock(&self, product_id: &ProductId, stock: i64) -> Result<()>;
}
