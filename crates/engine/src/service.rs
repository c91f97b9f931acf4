//! Order lifecycle controller.

use std::time::Instant;

use common::{OrderId, Principal, ProductId};
use domain::{
    Checkout, NewOrder, Order, OrderError, OrderPatch, OrderStatus, diff_items, normalize_status,
    order_total, plan_revision, validate_items,
};
use store::{OrderRepository, StockStore, StoreError};

use crate::error::EngineError;
use crate::executor::{AdjustmentReport, StockAdjustmentExecutor};

/// Runs one lifecycle operation and records its duration, whatever the
/// outcome.
async fn timed<T>(
    operation: &'static str,
    work: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    let started = Instant::now();
    let result = work.await;
    let outcome = if result.is_ok() { "ok" } else { "error" };
    metrics::histogram!(
        "order_operation_duration_seconds",
        "operation" => operation,
        "outcome" => outcome
    )
    .record(started.elapsed().as_secs_f64());
    result
}

/// Service owning the stock invariant across the order lifecycle.
///
/// Consumptions are reserved before the order document is written and
/// reverted if the write fails. Releases are applied only after the write
/// has committed, so a lost write never has to take back units that another
/// order may already have claimed.
pub struct OrderService<R: OrderRepository, S: StockStore> {
    orders: R,
    executor: StockAdjustmentExecutor<S>,
}

impl<R: OrderRepository, S: StockStore> OrderService<R, S> {
    /// Creates a new order service over the given stores.
    pub fn new(orders: R, stock: S) -> Self {
        Self {
            orders,
            executor: StockAdjustmentExecutor::new(stock),
        }
    }

    /// Returns a reference to the order repository.
    pub fn orders(&self) -> &R {
        &self.orders
    }

    /// Returns a reference to the stock store.
    pub fn stock(&self) -> &S {
        self.executor.store()
    }

    /// Places a new order and consumes stock for every item.
    #[tracing::instrument(skip(self, principal, cmd), fields(user_id = %cmd.user_id))]
    pub async fn create_order(
        &self,
        principal: &Principal,
        cmd: NewOrder,
    ) -> Result<Order, EngineError> {
        timed("create", async {
            if !principal.can_access(cmd.user_id) {
                return Err(forbidden(principal, "create orders for another user"));
            }

            let order = Order::place(cmd)?;
            let plan = diff_items(&[], &order.items)?;
            let report = self.executor.apply(&plan).await?;

            let inserted = self.orders.insert(&order).await;
            self.settle(&report, inserted).await?;

            metrics::counter!("orders_created_total").increment(1);
            tracing::info!(order_id = %order.id, total = %order.total_amount, "order created");

            Ok::<_, EngineError>(order)
        })
        .await
    }

    /// Places an order from a cart, verifying the client's declared total.
    #[tracing::instrument(skip(self, principal, checkout), fields(user_id = %checkout.order.user_id))]
    pub async fn checkout(
        &self,
        principal: &Principal,
        checkout: Checkout,
    ) -> Result<OrderId, EngineError> {
        validate_items(&checkout.order.items)?;

        if let Some(declared) = checkout.declared_total {
            let computed = order_total(&checkout.order.items)?;
            if declared != computed {
                return Err(OrderError::TotalMismatch { declared, computed }.into());
            }
        }

        let order = self.create_order(principal, checkout.order).await?;
        Ok(order.id)
    }

    /// Applies a status change and/or item replacement to an order.
    ///
    /// Both parts are validated before any stock moves. Their stock effects
    /// are composed into one adjustment plan, so the update either fully
    /// applies or leaves stock and order untouched.
    #[tracing::instrument(skip(self, principal, patch))]
    pub async fn update_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
        patch: OrderPatch,
    ) -> Result<Order, EngineError> {
        timed("update", async {
            let order = self.load_owned(principal, order_id, "update this order").await?;

            if patch.is_empty() {
                return Ok(order);
            }

            let next_status = match patch.status.as_deref() {
                Some(raw) => normalize_status(raw)?,
                None => order.status,
            };
            if order.status.is_terminal() && next_status != order.status {
                tracing::info!(%order_id, from = %order.status, to = %next_status, "leaving terminal status");
            }

            let plan = plan_revision(&order, patch.items.as_deref(), next_status)?;
            let adjustments = plan.len();
            let revised = order.revised(next_status, patch.items)?;

            let (consume, release) = plan.split();
            let report = self.executor.apply(&consume).await?;

            let saved = self.orders.save(revised).await;
            let saved = self.settle(&report, saved).await?;
            self.executor.release(&release).await?;

            metrics::counter!("orders_updated_total").increment(1);
            tracing::info!(
                %order_id,
                from = %order.status,
                to = %saved.status,
                adjustments,
                "order updated"
            );

            Ok::<_, EngineError>(saved)
        })
        .await
    }

    /// Removes an order and returns its committed stock once the delete has
    /// gone through.
    #[tracing::instrument(skip(self, principal))]
    pub async fn delete_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderId, EngineError> {
        timed("delete", async {
            let order = self.load_owned(principal, order_id, "delete this order").await?;

            let plan = plan_revision(&order, None, OrderStatus::Cancelled)?;
            let returned = plan.len();
            let (consume, release) = plan.split();
            let report = self.executor.apply(&consume).await?;

            let deleted = self.orders.delete(order_id, order.version).await;
            self.settle(&report, deleted).await?;
            self.executor.release(&release).await?;

            metrics::counter!("orders_deleted_total").increment(1);
            tracing::info!(%order_id, returned, "order deleted");

            Ok::<_, EngineError>(order_id)
        })
        .await
    }

    /// Loads an order the principal may see.
    #[tracing::instrument(skip(self, principal))]
    pub async fn get_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<Order, EngineError> {
        self.load_owned(principal, order_id, "view this order").await
    }

    /// Lists every order for admins, or the principal's own orders.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn list_orders(&self, principal: &Principal) -> Result<Vec<Order>, EngineError> {
        let orders = if principal.is_admin() {
            self.orders.list_all().await?
        } else {
            self.orders.list_for_user(principal.user_id).await?
        };
        Ok(orders)
    }

    /// Current stock of a product.
    pub async fn product_stock(&self, product_id: &ProductId) -> Result<i64, EngineError> {
        self.stock()
            .stock(product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotFound(product_id.clone()))
    }

    /// Overwrites a product's stock counter. Admin only.
    #[tracing::instrument(skip(self, principal))]
    pub async fn restock(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        stock: i64,
    ) -> Result<(), EngineError> {
        if !principal.is_admin() {
            return Err(forbidden(principal, "restock products"));
        }
        self.stock().set_stock(product_id, stock).await?;
        tracing::info!(%product_id, stock, "product restocked");
        Ok(())
    }

    async fn load_owned(
        &self,
        principal: &Principal,
        order_id: OrderId,
        action: &'static str,
    ) -> Result<Order, EngineError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if !principal.can_access(order.user_id) {
            return Err(forbidden(principal, action));
        }
        Ok(order)
    }

    /// Passes a persistence result through, reverting the reserved
    /// consumptions if the write failed.
    ///
    /// A failed revert is reported instead of the write error, since it
    /// leaves stock out of step with the stored orders.
    async fn settle<T>(
        &self,
        report: &AdjustmentReport,
        written: Result<T, StoreError>,
    ) -> Result<T, EngineError> {
        match written {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(error = %e, "order write failed, reverting stock");
                if let Err(revert) = self.executor.revert(report).await {
                    tracing::error!(error = %revert, write_error = %e, "stock not fully reverted after failed write");
                    return Err(revert);
                }
                Err(e.into())
            }
        }
    }
}

fn forbidden(principal: &Principal, action: &'static str) -> EngineError {
    tracing::warn!(user_id = %principal.user_id, action, "forbidden");
    EngineError::Forbidden {
        user_id: principal.user_id,
        action,
    }
}
