//! Value objects for the order domain.

use common::ProductId;
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Money amount represented in cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity. `None` if the product leaves the i64 range.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// A line item of an order.
///
/// `unit_price` is a snapshot taken when the item was ordered and is never
/// re-read from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns `quantity * unit_price`.
    pub fn line_total(&self) -> Result<Money, OrderError> {
        self.unit_price
            .checked_mul(self.quantity)
            .ok_or_else(|| OrderError::LineTotalOverflow {
                product_id: self.product_id.clone(),
            })
    }

    /// Checks the item at position `line` of a proposed item list.
    pub fn validate(&self, line: usize) -> Result<(), OrderError> {
        if self.product_id.is_blank() {
            return Err(OrderError::MissingProduct { line });
        }

        if self.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: self.product_id.clone(),
                quantity: 0,
            });
        }

        if self.unit_price.is_negative() {
            return Err(OrderError::InvalidPrice {
                product_id: self.product_id.clone(),
                price: self.unit_price.cents(),
            });
        }

        Ok(())
    }
}

/// Validates a proposed item list: non-empty, every line valid, and a
/// total that fits in the cents range.
pub fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }

    items
        .iter()
        .enumerate()
        .try_for_each(|(line, item)| item.validate(line))?;
    order_total(items).map(|_| ())
}

/// Σ(quantity × unit_price) over all items.
pub fn order_total(items: &[OrderItem]) -> Result<Money, OrderError> {
    items.iter().try_fold(Money::zero(), |total, item| {
        total
            .checked_add(item.line_total()?)
            .ok_or(OrderError::TotalOverflow)
    })
}
