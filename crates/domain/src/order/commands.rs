//! Order commands.

use common::{ProductId, UserId};
use serde::Deserialize;

use super::{Money, OrderError, OrderItem};

/// A line item as submitted by a client, before validation.
///
/// Quantities and prices are kept signed here so that out-of-range values
/// surface as validation errors instead of deserialization failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub product_id: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl ItemInput {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        Self {
            product_id: Some(product_id.into()),
            quantity,
            unit_price_cents,
        }
    }

    /// Converts the input at position `line` into a validated item.
    pub fn into_item(self, line: usize) -> Result<OrderItem, OrderError> {
        let product_id = match self.product_id {
            Some(id) if !id.trim().is_empty() => ProductId::new(id),
            _ => return Err(OrderError::MissingProduct { line }),
        };

        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| OrderError::InvalidQuantity {
                product_id: product_id.clone(),
                quantity: self.quantity,
            })?;

        let item = OrderItem::new(product_id, quantity, Money::from_cents(self.unit_price_cents));
        item.validate(line)?;
        Ok(item)
    }

    /// Converts a whole submitted list, failing on the first invalid line.
    pub fn parse_all(inputs: Vec<ItemInput>) -> Result<Vec<OrderItem>, OrderError> {
        inputs
            .into_iter()
            .enumerate()
            .map(|(line, input)| input.into_item(line))
            .collect()
    }
}

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The user who will own the order.
    pub user_id: UserId,

    /// Items to reserve.
    pub items: Vec<OrderItem>,

    /// Delivery address.
    pub address: String,
}

impl NewOrder {
    pub fn new(user_id: UserId, items: Vec<OrderItem>, address: impl Into<String>) -> Self {
        Self {
            user_id,
            items,
            address: address.into(),
        }
    }
}

/// Command to check out a cart, optionally verifying the client's total.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub order: NewOrder,

    /// Total the client believes it is paying.
    pub declared_total: Option<Money>,
}

impl Checkout {
    pub fn new(order: NewOrder, declared_total: Option<Money>) -> Self {
        Self {
            order,
            declared_total,
        }
    }
}

/// Partial update of an existing order.
///
/// Both fields may be present; their stock effects are composed into a
/// single adjustment.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    /// Requested status, not yet normalized.
    pub status: Option<String>,

    /// Replacement item list.
    pub items: Option<Vec<OrderItem>>,
}

impl OrderPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_items(mut self, items: Vec<OrderItem>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.items.is_none()
    }
}
