//! Item diff engine.
//!
//! Turns changes to an order's committed line items into signed per-product
//! stock adjustments. A negative delta consumes stock, a positive delta
//! returns it.

use std::collections::BTreeMap;

use common::ProductId;

use super::{Order, OrderError, OrderItem, OrderStatus, cancellation_delta, validate_items};

/// A single signed change to one product's stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub delta: i64,
}

impl StockAdjustment {
    pub fn new(product_id: impl Into<ProductId>, delta: i64) -> Self {
        Self {
            product_id: product_id.into(),
            delta,
        }
    }

    /// Returns true if this adjustment takes units out of stock.
    pub fn is_consumption(&self) -> bool {
        self.delta < 0
    }

    /// The adjustment that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            product_id: self.product_id.clone(),
            delta: -self.delta,
        }
    }
}

/// Net stock deltas for one logical operation, one entry per product.
///
/// Zero deltas are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentPlan {
    deltas: BTreeMap<ProductId, i64>,
}

impl AdjustmentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the product's running total.
    pub fn add(&mut self, product_id: ProductId, delta: i64) {
        let entry = self.deltas.entry(product_id).or_insert(0);
        *entry += delta;
        if *entry == 0 {
            self.deltas.retain(|_, d| *d != 0);
        }
    }

    pub fn delta_for(&self, product_id: &ProductId) -> i64 {
        self.deltas.get(product_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// The plan as a list of adjustments in application order.
    ///
    /// Consumptions come first, since only they can fail; within each group
    /// products are ordered by id.
    pub fn adjustments(&self) -> Vec<StockAdjustment> {
        let (mut consume, release): (Vec<_>, Vec<_>) = self
            .deltas
            .iter()
            .map(|(product_id, delta)| StockAdjustment::new(product_id.clone(), *delta))
            .partition(StockAdjustment::is_consumption);
        consume.extend(release);
        consume
    }

    /// Splits the plan into its consumptions and its releases.
    ///
    /// Consumptions can fail and must be reserved before the order write.
    /// Releases cannot fail for lack of stock, so they are applied only once
    /// the write that frees the units has succeeded.
    pub fn split(self) -> (AdjustmentPlan, AdjustmentPlan) {
        let (consume, release) = self.deltas.into_iter().partition(|(_, delta)| *delta < 0);
        (Self { deltas: consume }, Self { deltas: release })
    }
}

impl FromIterator<StockAdjustment> for AdjustmentPlan {
    fn from_iter<I: IntoIterator<Item = StockAdjustment>>(iter: I) -> Self {
        let mut plan = AdjustmentPlan::new();
        for adjustment in iter {
            plan.add(adjustment.product_id, adjustment.delta);
        }
        plan
    }
}

/// Quantities per product from already-committed items.
///
/// Stale entries cannot be repaired at this point, so they are skipped.
fn committed_quantities(items: &[OrderItem]) -> BTreeMap<ProductId, i64> {
    let mut quantities = BTreeMap::new();
    for (line, item) in items.iter().enumerate() {
        if item.product_id.is_blank() || item.quantity == 0 {
            tracing::warn!(
                line,
                product_id = %item.product_id,
                quantity = item.quantity,
                "skipping invalid committed line item"
            );
            continue;
        }
        *quantities.entry(item.product_id.clone()).or_insert(0) += i64::from(item.quantity);
    }
    quantities
}

/// Quantities per product from proposed items. Any invalid line rejects.
fn proposed_quantities(items: &[OrderItem]) -> Result<BTreeMap<ProductId, i64>, OrderError> {
    let mut quantities = BTreeMap::new();
    for (line, item) in items.iter().enumerate() {
        item.validate(line)?;
        *quantities.entry(item.product_id.clone()).or_insert(0) += i64::from(item.quantity);
    }
    Ok(quantities)
}

/// Computes the stock adjustments needed to move from `previous` to
/// `proposed` committed items.
///
/// For every product in either set the stock delta is `old - new`: growing a
/// line consumes stock, shrinking or dropping it returns stock.
pub fn diff_items(
    previous: &[OrderItem],
    proposed: &[OrderItem],
) -> Result<AdjustmentPlan, OrderError> {
    let new_quantities = proposed_quantities(proposed)?;
    let old_quantities = committed_quantities(previous);

    let mut plan = AdjustmentPlan::new();
    for (product_id, old) in &old_quantities {
        plan.add(product_id.clone(), *old);
    }
    for (product_id, new) in new_quantities {
        plan.add(product_id, -new);
    }
    Ok(plan)
}

/// Adjustments for a status-only transition: every committed item's
/// quantity multiplied by the cancellation delta.
pub fn cancellation_plan(items: &[OrderItem], delta: i64) -> AdjustmentPlan {
    if delta == 0 {
        return AdjustmentPlan::new();
    }

    committed_quantities(items)
        .into_iter()
        .map(|(product_id, quantity)| StockAdjustment::new(product_id, quantity * delta))
        .collect()
}

/// Composes the item diff and the cancellation transition of an update into
/// one plan.
///
/// Only items of a non-cancelled order hold stock, so the composition is the
/// diff between what the order holds now and what it will hold afterwards.
/// Proposed items are validated even when the order ends up cancelled.
pub fn plan_revision(
    order: &Order,
    proposed_items: Option<&[OrderItem]>,
    next_status: OrderStatus,
) -> Result<AdjustmentPlan, OrderError> {
    let Some(proposed) = proposed_items else {
        return Ok(cancellation_plan(
            &order.items,
            cancellation_delta(order.status, next_status),
        ));
    };

    validate_items(proposed)?;
    let held_after: &[OrderItem] = if next_status.is_cancelled() { &[] } else { proposed };
    diff_items(order.committed_items(), held_after)
}
