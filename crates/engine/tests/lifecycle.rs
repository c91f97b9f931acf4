//! End-to-end order lifecycle tests against the in-memory stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use common::{OrderId, Principal, ProductId, UserId};
use domain::{Checkout, Money, NewOrder, Order, OrderError, OrderItem, OrderPatch, OrderStatus};
use engine::{EngineError, OrderService};
use store::{
    AdjustOutcome, InMemoryOrderRepository, InMemoryStockStore, OrderRepository, StockStore,
    StoreError,
};

type Service<R = InMemoryOrderRepository> = OrderService<R, InMemoryStockStore>;

fn p(id: &str) -> ProductId {
    ProductId::new(id)
}

fn item(product: &str, quantity: u32) -> OrderItem {
    OrderItem::new(product, quantity, Money::from_cents(250))
}

fn service(stock: &[(&str, i64)]) -> Service {
    OrderService::new(
        InMemoryOrderRepository::new(),
        InMemoryStockStore::with_stock(stock.iter().map(|(id, n)| (*id, *n))),
    )
}

async fn stock_of<R: OrderRepository>(svc: &Service<R>, product: &str) -> i64 {
    svc.product_stock(&p(product)).await.unwrap()
}

async fn place<R: OrderRepository>(
    svc: &Service<R>,
    user: &Principal,
    items: Vec<OrderItem>,
) -> Order {
    svc.create_order(user, NewOrder::new(user.user_id, items, "221B Baker Street"))
        .await
        .unwrap()
}

async fn set_status<R: OrderRepository>(
    svc: &Service<R>,
    user: &Principal,
    order_id: OrderId,
    status: &str,
) -> Result<Order, EngineError> {
    svc.update_order(user, order_id, OrderPatch::new().with_status(status))
        .await
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn cancel_and_restore_scenario() {
        let svc = service(&[("p1", 10)]);
        let alice = Principal::customer(UserId::new());
        let bob = Principal::customer(UserId::new());

        let order = place(&svc, &alice, vec![item("p1", 4)]).await;
        assert_eq!(stock_of(&svc, "p1").await, 6);

        set_status(&svc, &alice, order.id, "cancelled").await.unwrap();
        assert_eq!(stock_of(&svc, "p1").await, 10);

        set_status(&svc, &alice, order.id, "pending").await.unwrap();
        assert_eq!(stock_of(&svc, "p1").await, 6);

        set_status(&svc, &alice, order.id, "canceled").await.unwrap();
        assert_eq!(stock_of(&svc, "p1").await, 10);

        place(&svc, &bob, vec![item("p1", 7)]).await;
        assert_eq!(stock_of(&svc, "p1").await, 3);

        let err = set_status(&svc, &alice, order.id, "pending")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            }
        ));
        assert_eq!(stock_of(&svc, "p1").await, 3);

        let stored = svc.get_order(&alice, order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_then_restore_round_trip() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());

        let order = place(&svc, &user, vec![item("p1", 3)]).await;
        assert_eq!(stock_of(&svc, "p1").await, 7);

        set_status(&svc, &user, order.id, "отменён").await.unwrap();
        assert_eq!(stock_of(&svc, "p1").await, 10);

        let restored = set_status(&svc, &user, order.id, "pending").await.unwrap();
        assert_eq!(restored.status, OrderStatus::Pending);
        assert_eq!(stock_of(&svc, "p1").await, 7);
    }

    #[tokio::test]
    async fn same_status_update_moves_no_stock() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 2)]).await;

        let saved = set_status(&svc, &user, order.id, " PENDING ").await.unwrap();

        assert_eq!(saved.status, OrderStatus::Pending);
        assert_eq!(saved.version, 2);
        assert_eq!(stock_of(&svc, "p1").await, 8);
    }

    #[tokio::test]
    async fn non_cancelling_transitions_move_no_stock() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 2)]).await;

        for status in ["processing", "shipped", "delivered"] {
            set_status(&svc, &user, order.id, status).await.unwrap();
            assert_eq!(stock_of(&svc, "p1").await, 8);
        }
    }

    #[tokio::test]
    async fn invalid_status_is_rejected_without_side_effects() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 2)]).await;

        let err = set_status(&svc, &user, order.id, "lost").await.unwrap_err();

        assert!(matches!(err, EngineError::Order(OrderError::InvalidStatus(_))));
        assert_eq!(stock_of(&svc, "p1").await, 8);
        assert_eq!(svc.get_order(&user, order.id).await.unwrap().version, 1);
    }
}

mod items {
    use super::*;

    #[tokio::test]
    async fn growing_and_dropping_lines_adjusts_stock() {
        let svc = service(&[("p1", 10), ("p2", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 2), item("p2", 3)]).await;

        let saved = svc
            .update_order(&user, order.id, OrderPatch::new().with_items(vec![item("p1", 5)]))
            .await
            .unwrap();

        assert_eq!(saved.total_amount.cents(), 1250);
        assert_eq!(stock_of(&svc, "p1").await, 5);
        assert_eq!(stock_of(&svc, "p2").await, 10);
    }

    #[tokio::test]
    async fn duplicate_lines_are_summed_per_product() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());

        place(&svc, &user, vec![item("p1", 2), item("p1", 3)]).await;

        assert_eq!(stock_of(&svc, "p1").await, 5);
    }

    #[tokio::test]
    async fn items_and_cancellation_compose() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 2)]).await;
        assert_eq!(stock_of(&svc, "p1").await, 8);

        let saved = svc
            .update_order(
                &user,
                order.id,
                OrderPatch::new()
                    .with_status("cancelled")
                    .with_items(vec![item("p1", 5)]),
            )
            .await
            .unwrap();

        assert_eq!(saved.status, OrderStatus::Cancelled);
        assert_eq!(saved.items, vec![item("p1", 5)]);
        assert_eq!(stock_of(&svc, "p1").await, 10);

        set_status(&svc, &user, order.id, "pending").await.unwrap();
        assert_eq!(stock_of(&svc, "p1").await, 5);
    }

    #[tokio::test]
    async fn editing_a_cancelled_order_holds_no_stock() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 2)]).await;
        set_status(&svc, &user, order.id, "cancelled").await.unwrap();

        svc.update_order(&user, order.id, OrderPatch::new().with_items(vec![item("p1", 9)]))
            .await
            .unwrap();

        assert_eq!(stock_of(&svc, "p1").await, 10);
    }

    #[tokio::test]
    async fn failed_growth_leaves_order_and_stock_untouched() {
        let svc = service(&[("p1", 3), ("p2", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 1), item("p2", 1)]).await;

        let err = svc
            .update_order(
                &user,
                order.id,
                OrderPatch::new().with_items(vec![item("p1", 9), item("p2", 4)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InsufficientStock { .. }));
        assert_eq!(stock_of(&svc, "p1").await, 2);
        assert_eq!(stock_of(&svc, "p2").await, 9);
        assert_eq!(svc.get_order(&user, order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn empty_item_list_is_rejected() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 2)]).await;

        let err = svc
            .update_order(&user, order.id, OrderPatch::new().with_items(vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Order(OrderError::NoItems)));
        assert_eq!(stock_of(&svc, "p1").await, 8);
    }
}

mod create {
    use super::*;

    #[tokio::test]
    async fn multi_product_failure_compensates_earlier_products() {
        let svc = service(&[("a", 5), ("b", 5), ("c", 1)]);
        let user = Principal::customer(UserId::new());

        let err = svc
            .create_order(
                &user,
                NewOrder::new(
                    user.user_id,
                    vec![item("a", 2), item("b", 2), item("c", 2)],
                    "addr",
                ),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InsufficientStock { ref product_id, .. } if product_id.as_str() == "c"));
        assert_eq!(stock_of(&svc, "a").await, 5);
        assert_eq!(stock_of(&svc, "b").await, 5);
        assert_eq!(stock_of(&svc, "c").await, 1);
        assert_eq!(svc.orders().order_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let svc = service(&[("a", 5)]);
        let user = Principal::customer(UserId::new());

        let err = svc
            .create_order(
                &user,
                NewOrder::new(user.user_id, vec![item("a", 1), item("ghost", 1)], "addr"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ProductNotFound(_)));
        assert_eq!(stock_of(&svc, "a").await, 5);
    }

    #[tokio::test]
    async fn checkout_verifies_declared_total() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let cart = NewOrder::new(user.user_id, vec![item("p1", 2)], "addr");

        let err = svc
            .checkout(&user, Checkout::new(cart.clone(), Some(Money::from_cents(1))))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Order(OrderError::TotalMismatch { .. })
        ));
        assert_eq!(stock_of(&svc, "p1").await, 10);

        let order_id = svc
            .checkout(&user, Checkout::new(cart, Some(Money::from_cents(500))))
            .await
            .unwrap();
        assert_eq!(svc.get_order(&user, order_id).await.unwrap().status, OrderStatus::Pending);
        assert_eq!(stock_of(&svc, "p1").await, 8);
    }

    #[tokio::test]
    async fn checkout_without_declared_total() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());

        svc.checkout(
            &user,
            Checkout::new(NewOrder::new(user.user_id, vec![item("p1", 1)], "addr"), None),
        )
        .await
        .unwrap();

        assert_eq!(stock_of(&svc, "p1").await, 9);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_an_active_order_returns_stock() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;

        assert_eq!(svc.delete_order(&user, order.id).await.unwrap(), order.id);

        assert_eq!(stock_of(&svc, "p1").await, 10);
        assert!(matches!(
            svc.get_order(&user, order.id).await,
            Err(EngineError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_cancelled_order_moves_no_stock() {
        let svc = service(&[("p1", 10)]);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;
        set_status(&svc, &user, order.id, "cancelled").await.unwrap();

        svc.delete_order(&user, order.id).await.unwrap();

        assert_eq!(stock_of(&svc, "p1").await, 10);
    }

    #[tokio::test]
    async fn deleting_a_missing_order_is_not_found() {
        let svc = service(&[]);
        let err = svc
            .delete_order(&Principal::admin(UserId::new()), OrderId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::OrderNotFound(_)));
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn customers_only_touch_their_own_orders() {
        let svc = service(&[("p1", 10)]);
        let owner = Principal::customer(UserId::new());
        let stranger = Principal::customer(UserId::new());
        let order = place(&svc, &owner, vec![item("p1", 1)]).await;

        assert!(matches!(
            svc.get_order(&stranger, order.id).await,
            Err(EngineError::Forbidden { .. })
        ));
        assert!(matches!(
            set_status(&svc, &stranger, order.id, "cancelled").await,
            Err(EngineError::Forbidden { .. })
        ));
        assert!(matches!(
            svc.delete_order(&stranger, order.id).await,
            Err(EngineError::Forbidden { .. })
        ));
        assert_eq!(stock_of(&svc, "p1").await, 9);
    }

    #[tokio::test]
    async fn admins_act_on_any_order() {
        let svc = service(&[("p1", 10)]);
        let owner = Principal::customer(UserId::new());
        let admin = Principal::admin(UserId::new());
        let order = place(&svc, &owner, vec![item("p1", 1)]).await;

        set_status(&svc, &admin, order.id, "shipped").await.unwrap();
        let on_behalf = svc
            .create_order(
                &admin,
                NewOrder::new(owner.user_id, vec![item("p1", 2)], "addr"),
            )
            .await
            .unwrap();

        assert_eq!(on_behalf.user_id, owner.user_id);
        assert_eq!(stock_of(&svc, "p1").await, 7);
    }

    #[tokio::test]
    async fn listing_is_scoped_by_role() {
        let svc = service(&[("p1", 10)]);
        let alice = Principal::customer(UserId::new());
        let bob = Principal::customer(UserId::new());

        place(&svc, &alice, vec![item("p1", 1)]).await;
        place(&svc, &alice, vec![item("p1", 1)]).await;
        place(&svc, &bob, vec![item("p1", 1)]).await;

        assert_eq!(svc.list_orders(&alice).await.unwrap().len(), 2);
        assert_eq!(svc.list_orders(&bob).await.unwrap().len(), 1);
        assert_eq!(
            svc.list_orders(&Principal::admin(UserId::new()))
                .await
                .unwrap()
                .len(),
            3
        );
    }
}

mod consistency {
    use super::*;
    use futures_util::future::join_all;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_never_oversell() {
        let svc = Arc::new(service(&[("p1", 10)]));

        let attempts = (0..2).map(|_| {
            let svc = svc.clone();
            async move {
                let user = Principal::customer(UserId::new());
                svc.create_order(&user, NewOrder::new(user.user_id, vec![item("p1", 6)], "addr"))
                    .await
            }
        });
        let results = join_all(attempts).await;

        let created = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(EngineError::InsufficientStock { .. })))
            .count();

        assert_eq!(created, 1);
        assert_eq!(rejected, 1);
        assert_eq!(stock_of(&*svc, "p1").await, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_concurrent_creates_stop_at_zero() {
        let svc = Arc::new(service(&[("p1", 25)]));

        let attempts = (0..40).map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move {
                let user = Principal::customer(UserId::new());
                svc.create_order(&user, NewOrder::new(user.user_id, vec![item("p1", 2)], "addr"))
                    .await
                    .is_ok()
            })
        });
        let created = join_all(attempts)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();

        assert_eq!(created, 12);
        assert_eq!(stock_of(&*svc, "p1").await, 1);
    }

    #[tokio::test]
    async fn stock_matches_active_orders_after_mixed_operations() {
        let initial = 50;
        let svc = service(&[("p1", initial)]);
        let user = Principal::customer(UserId::new());

        let a = place(&svc, &user, vec![item("p1", 3)]).await;
        let b = place(&svc, &user, vec![item("p1", 5), item("p1", 1)]).await;
        let c = place(&svc, &user, vec![item("p1", 7)]).await;

        set_status(&svc, &user, a.id, "cancelled").await.unwrap();
        svc.update_order(&user, b.id, OrderPatch::new().with_items(vec![item("p1", 2)]))
            .await
            .unwrap();
        set_status(&svc, &user, c.id, "delivered").await.unwrap();
        set_status(&svc, &user, a.id, "processing").await.unwrap();
        svc.delete_order(&user, c.id).await.unwrap();

        let consumed: i64 = svc
            .list_orders(&user)
            .await
            .unwrap()
            .iter()
            .filter(|o| !o.is_cancelled())
            .flat_map(|o| o.items.iter())
            .map(|i| i64::from(i.quantity))
            .sum();

        assert_eq!(consumed, 5);
        assert_eq!(initial - stock_of(&svc, "p1").await, consumed);
    }
}

/// Repository whose writes can be made to lose a race.
///
/// With `rival_checkout` set, the losing write first lets a competing
/// checkout take every unit of `p1` that is currently available.
#[derive(Clone, Default)]
struct RacingRepository {
    inner: InMemoryOrderRepository,
    stock: InMemoryStockStore,
    lose_next_write: Arc<AtomicBool>,
    rival_checkout: Arc<AtomicBool>,
    rival_taken: Arc<AtomicI64>,
}

impl RacingRepository {
    async fn lose_race(&self) -> bool {
        if !self.lose_next_write.swap(false, Ordering::SeqCst) {
            return false;
        }
        if self.rival_checkout.load(Ordering::SeqCst) {
            let available = self.stock.stock(&p("p1")).await.unwrap().unwrap_or(0);
            if available > 0 {
                let outcome = self.stock.adjust(&p("p1"), -available).await.unwrap();
                assert!(matches!(outcome, AdjustOutcome::Applied { .. }));
                self.rival_taken.fetch_add(available, Ordering::SeqCst);
            }
        }
        true
    }

    fn conflict(order_id: OrderId, expected: u64) -> StoreError {
        StoreError::ConcurrencyConflict {
            order_id,
            expected,
            actual: expected + 1,
        }
    }
}

#[async_trait]
impl OrderRepository for RacingRepository {
    async fn insert(&self, order: &Order) -> store::Result<()> {
        if self.lose_race().await {
            return Err(StoreError::DuplicateOrder(order.id));
        }
        self.inner.insert(order).await
    }

    async fn get(&self, order_id: OrderId) -> store::Result<Option<Order>> {
        self.inner.get(order_id).await
    }

    async fn save(&self, order: Order) -> store::Result<Order> {
        if self.lose_race().await {
            return Err(Self::conflict(order.id, order.version));
        }
        self.inner.save(order).await
    }

    async fn delete(&self, order_id: OrderId, expected_version: u64) -> store::Result<()> {
        if self.lose_race().await {
            return Err(Self::conflict(order_id, expected_version));
        }
        self.inner.delete(order_id, expected_version).await
    }

    async fn list_for_user(&self, user_id: UserId) -> store::Result<Vec<Order>> {
        self.inner.list_for_user(user_id).await
    }

    async fn list_all(&self) -> store::Result<Vec<Order>> {
        self.inner.list_all().await
    }
}

mod write_failures {
    use super::*;

    fn racing_service(stock: i64) -> (Service<RacingRepository>, RacingRepository) {
        let stock = InMemoryStockStore::with_stock([("p1", stock)]);
        let repo = RacingRepository {
            stock: stock.clone(),
            ..RacingRepository::default()
        };
        (OrderService::new(repo.clone(), stock), repo)
    }

    /// Units held by the order that survived plus the rival's take.
    async fn held(
        svc: &Service<RacingRepository>,
        user: &Principal,
        repo: &RacingRepository,
    ) -> i64 {
        let by_orders: i64 = svc
            .list_orders(user)
            .await
            .unwrap()
            .iter()
            .filter(|o| !o.is_cancelled())
            .flat_map(|o| o.items.iter())
            .map(|i| i64::from(i.quantity))
            .sum();
        by_orders + repo.rival_taken.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn failed_insert_reverts_consumption() {
        let (svc, repo) = racing_service(10);
        let user = Principal::customer(UserId::new());
        repo.lose_next_write.store(true, Ordering::SeqCst);

        let err = svc
            .create_order(&user, NewOrder::new(user.user_id, vec![item("p1", 4)], "addr"))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Store(StoreError::DuplicateOrder(_))));
        assert_eq!(stock_of(&svc, "p1").await, 10);
    }

    #[tokio::test]
    async fn conflicting_update_reverts_stock() {
        let (svc, repo) = racing_service(10);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;
        repo.lose_next_write.store(true, Ordering::SeqCst);

        let err = svc
            .update_order(&user, order.id, OrderPatch::new().with_items(vec![item("p1", 9)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Store(StoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(stock_of(&svc, "p1").await, 6);
        assert_eq!(svc.get_order(&user, order.id).await.unwrap().items, order.items);
    }

    #[tokio::test]
    async fn conflicting_delete_keeps_stock_held() {
        let (svc, repo) = racing_service(10);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;
        repo.lose_next_write.store(true, Ordering::SeqCst);

        assert!(svc.delete_order(&user, order.id).await.is_err());

        assert_eq!(stock_of(&svc, "p1").await, 6);
        assert!(svc.get_order(&user, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn delete_losing_to_a_checkout_does_not_oversell() {
        let (svc, repo) = racing_service(10);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;
        repo.rival_checkout.store(true, Ordering::SeqCst);
        repo.lose_next_write.store(true, Ordering::SeqCst);

        let err = svc.delete_order(&user, order.id).await.unwrap_err();

        assert_eq!(err.kind(), domain::ErrorKind::Conflict);
        assert_eq!(repo.rival_taken.load(Ordering::SeqCst), 6);
        assert_eq!(stock_of(&svc, "p1").await, 0);
        assert_eq!(
            svc.get_order(&user, order.id).await.unwrap().status,
            OrderStatus::Pending
        );
        assert_eq!(10 - stock_of(&svc, "p1").await, held(&svc, &user, &repo).await);
    }

    #[tokio::test]
    async fn cancel_losing_to_a_checkout_does_not_oversell() {
        let (svc, repo) = racing_service(10);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;
        repo.rival_checkout.store(true, Ordering::SeqCst);
        repo.lose_next_write.store(true, Ordering::SeqCst);

        let err = set_status(&svc, &user, order.id, "cancelled")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), domain::ErrorKind::Conflict);
        assert_eq!(
            svc.get_order(&user, order.id).await.unwrap().status,
            OrderStatus::Pending
        );
        assert_eq!(10 - stock_of(&svc, "p1").await, held(&svc, &user, &repo).await);
    }

    #[tokio::test]
    async fn shrink_losing_to_a_checkout_does_not_oversell() {
        let (svc, repo) = racing_service(10);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;
        repo.rival_checkout.store(true, Ordering::SeqCst);
        repo.lose_next_write.store(true, Ordering::SeqCst);

        assert!(
            svc.update_order(&user, order.id, OrderPatch::new().with_items(vec![item("p1", 1)]))
                .await
                .is_err()
        );

        assert_eq!(svc.get_order(&user, order.id).await.unwrap().items, order.items);
        assert_eq!(10 - stock_of(&svc, "p1").await, held(&svc, &user, &repo).await);
    }

    #[tokio::test]
    async fn successful_cancel_returns_units_after_the_write() {
        let (svc, _repo) = racing_service(10);
        let user = Principal::customer(UserId::new());
        let order = place(&svc, &user, vec![item("p1", 4)]).await;

        let saved = set_status(&svc, &user, order.id, "cancelled").await.unwrap();

        assert_eq!(saved.version, 2);
        assert_eq!(stock_of(&svc, "p1").await, 10);
    }
}
