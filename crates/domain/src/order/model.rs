//! The persisted order document.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{
    Money, NewOrder, OrderError, OrderItem, OrderStatus, order_total, validate_items,
};

/// An order document.
///
/// `total_amount` is derived from `items` and is recomputed whenever the
/// items change. `version` starts at 1 and is bumped by the repository on
/// every successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    /// Validates a new order and builds it in `Pending` status.
    pub fn place(cmd: NewOrder) -> Result<Self, OrderError> {
        validate_items(&cmd.items)?;

        let address = cmd.address.trim();
        if address.is_empty() {
            return Err(OrderError::AddressRequired);
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user_id: cmd.user_id,
            total_amount: order_total(&cmd.items)?,
            items: cmd.items,
            status: OrderStatus::Pending,
            address: address.to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    /// Items currently holding stock. Empty while the order is cancelled.
    pub fn committed_items(&self) -> &[OrderItem] {
        if self.is_cancelled() { &[] } else { self.items.as_slice() }
    }

    /// Returns a copy carrying the given status and, if provided, the
    /// replacement items with a recomputed total.
    ///
    /// The version is left untouched; the repository advances it on save.
    pub fn revised(
        &self,
        status: OrderStatus,
        items: Option<Vec<OrderItem>>,
    ) -> Result<Order, OrderError> {
        let mut next = self.clone();
        next.status = status;
        if let Some(items) = items {
            next.total_amount = order_total(&items)?;
            next.items = items;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}
