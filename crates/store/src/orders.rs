use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::Order;

use crate::Result;

/// Storage for order documents.
///
/// Every stored order carries a version. Writers pass back the order as they
/// read it; if another writer saved in between, the write fails with
/// `ConcurrencyConflict` and nothing is changed.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order as-is.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads an order by id.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Replaces the stored order if its version still equals `order.version`.
    ///
    /// Returns the order as stored, with the version advanced by one.
    async fn save(&self, order: Order) -> Result<Order>;

    /// Removes the order if its stored version equals `expected_version`.
    async fn delete(&self, order_id: OrderId, expected_version: u64) -> Result<()>;

    /// Orders owned by a user, oldest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// All orders, oldest first.
    async fn list_all(&self) -> Result<Vec<Order>>;
}
