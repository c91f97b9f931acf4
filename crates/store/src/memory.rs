use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::Order;
use tokio::sync::RwLock;

use crate::{AdjustOutcome, OrderRepository, Result, StockStore, StoreError};

/// In-memory stock store.
///
/// Every adjustment runs under the write lock, which makes the conditional
/// decrement atomic with respect to other callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockStore {
    products: Arc<RwLock<HashMap<ProductId, i64>>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `(product, stock)` pairs.
    pub fn with_stock<P>(entries: impl IntoIterator<Item = (P, i64)>) -> Self
    where
        P: Into<ProductId>,
    {
        let products = entries
            .into_iter()
            .map(|(id, stock)| (id.into(), stock))
            .collect();
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<AdjustOutcome> {
        let mut products = self.products.write().await;

        let Some(stock) = products.get_mut(product_id) else {
            return Ok(AdjustOutcome::UnknownProduct);
        };

        let next = stock.checked_add(delta).ok_or(StoreError::StockOverflow {
            product_id: product_id.clone(),
            stock: *stock,
            delta,
        })?;
        if next < 0 {
            return Ok(AdjustOutcome::Insufficient { available: *stock });
        }

        *stock = next;
        Ok(AdjustOutcome::Applied { stock: next })
    }

    async fn stock(&self, product_id: &ProductId) -> Result<Option<i64>> {
        Ok(self.products.read().await.get(product_id).copied())
    }

    async fn set_stock(&self, product_id: &ProductId, stock: i64) -> Result<()> {
        if stock < 0 {
            return Err(StoreError::InvalidStock {
                product_id: product_id.clone(),
                stock,
            });
        }
        self.products.write().await.insert(product_id.clone(), stock);
        Ok(())
    }
}

/// In-memory order repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

fn oldest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    orders
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn save(&self, mut order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;

        let stored = orders
            .get_mut(&order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;

        if stored.version != order.version {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id,
                expected: order.version,
                actual: stored.version,
            });
        }

        order.version += 1;
        *stored = order.clone();
        Ok(order)
    }

    async fn delete(&self, order_id: OrderId, expected_version: u64) -> Result<()> {
        let mut orders = self.orders.write().await;

        let stored = orders
            .get(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if stored.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                order_id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        orders.remove(&order_id);
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(oldest_first(
            orders
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        Ok(oldest_first(
            self.orders.read().await.values().cloned().collect(),
        ))
    }
}
