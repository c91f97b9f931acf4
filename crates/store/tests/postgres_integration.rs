//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{ProductId, UserId};
use domain::{Money, NewOrder, Order, OrderItem, OrderStatus};
use serial_test::serial;
use sqlx::PgPool;
use store::{AdjustOutcome, OrderRepository, PostgresStore, StockStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let store = PostgresStore::new(PgPool::connect(&connection_string).await.unwrap());
            store.run_migrations().await.unwrap();
            store.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh store with its own pool and empty tables.
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn p(id: &str) -> ProductId {
    ProductId::new(id)
}

fn sample_order() -> Order {
    Order::place(NewOrder::new(
        UserId::new(),
        vec![
            OrderItem::new("SKU-001", 2, Money::from_cents(1250)),
            OrderItem::new("SKU-002", 1, Money::from_cents(300)),
        ],
        "10 Downing Street",
    ))
    .unwrap()
}

#[tokio::test]
#[serial]
async fn conditional_decrement_respects_stock() {
    let store = get_test_store().await;
    store.set_stock(&p("SKU-001"), 4).await.unwrap();

    assert_eq!(
        store.adjust(&p("SKU-001"), -3).await.unwrap(),
        AdjustOutcome::Applied { stock: 1 }
    );
    assert_eq!(
        store.adjust(&p("SKU-001"), -2).await.unwrap(),
        AdjustOutcome::Insufficient { available: 1 }
    );
    assert_eq!(
        store.adjust(&p("SKU-404"), 1).await.unwrap(),
        AdjustOutcome::UnknownProduct
    );
    assert_eq!(store.stock(&p("SKU-001")).await.unwrap(), Some(1));
}

#[tokio::test]
#[serial]
async fn concurrent_decrements_never_oversell() {
    let store = get_test_store().await;
    store.set_stock(&p("SKU-001"), 10).await.unwrap();

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.adjust(&p("SKU-001"), -4).await.unwrap() })
        })
        .collect();

    let mut applied = 0;
    for task in tasks {
        match task.await.unwrap() {
            AdjustOutcome::Applied { .. } => applied += 1,
            // A miss always reports the level that actually blocked it.
            AdjustOutcome::Insufficient { available } => assert!(available < 4),
            AdjustOutcome::UnknownProduct => panic!("product vanished"),
        }
    }

    assert_eq!(applied, 2);
    assert_eq!(store.stock(&p("SKU-001")).await.unwrap(), Some(2));
}

#[tokio::test]
#[serial]
async fn overflowing_increment_is_rejected() {
    let store = get_test_store().await;
    store.set_stock(&p("SKU-001"), i64::MAX).await.unwrap();

    assert!(matches!(
        store.adjust(&p("SKU-001"), 1).await,
        Err(StoreError::StockOverflow { .. })
    ));
    assert_eq!(store.stock(&p("SKU-001")).await.unwrap(), Some(i64::MAX));
}

#[tokio::test]
#[serial]
async fn set_stock_upserts_and_rejects_negatives() {
    let store = get_test_store().await;

    store.set_stock(&p("SKU-001"), 3).await.unwrap();
    store.set_stock(&p("SKU-001"), 8).await.unwrap();
    assert_eq!(store.stock(&p("SKU-001")).await.unwrap(), Some(8));

    assert!(matches!(
        store.set_stock(&p("SKU-001"), -1).await,
        Err(StoreError::InvalidStock { .. })
    ));
}

#[tokio::test]
#[serial]
async fn order_round_trips_through_storage() {
    let store = get_test_store().await;
    let order = sample_order();

    store.insert(&order).await.unwrap();
    let loaded = store.get(order.id).await.unwrap().unwrap();

    assert_eq!(loaded.id, order.id);
    assert_eq!(loaded.user_id, order.user_id);
    assert_eq!(loaded.items, order.items);
    assert_eq!(loaded.status, OrderStatus::Pending);
    assert_eq!(loaded.total_amount.cents(), 2800);
    assert_eq!(loaded.address, "10 Downing Street");
    assert_eq!(loaded.version, 1);
}

#[tokio::test]
#[serial]
async fn duplicate_insert_is_rejected() {
    let store = get_test_store().await;
    let order = sample_order();

    store.insert(&order).await.unwrap();
    assert!(matches!(
        store.insert(&order).await,
        Err(StoreError::DuplicateOrder(_))
    ));
}

#[tokio::test]
#[serial]
async fn save_uses_optimistic_versioning() {
    let store = get_test_store().await;
    let order = sample_order();
    store.insert(&order).await.unwrap();

    let saved = store
        .save(
            order
                .revised(
                    OrderStatus::Cancelled,
                    Some(vec![OrderItem::new("SKU-003", 4, Money::from_cents(100))]),
                )
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(saved.version, 2);

    let loaded = store.get(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Cancelled);
    assert_eq!(loaded.total_amount.cents(), 400);
    assert_eq!(loaded.version, 2);

    let err = store.save(order.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::ConcurrencyConflict {
            expected: 1,
            actual: 2,
            ..
        }
    ));
}

#[tokio::test]
#[serial]
async fn delete_checks_version_and_existence() {
    let store = get_test_store().await;
    let order = sample_order();
    store.insert(&order).await.unwrap();

    assert!(matches!(
        store.delete(order.id, 5).await,
        Err(StoreError::ConcurrencyConflict { .. })
    ));
    store.delete(order.id, 1).await.unwrap();
    assert!(store.get(order.id).await.unwrap().is_none());
    assert!(matches!(
        store.delete(order.id, 1).await,
        Err(StoreError::OrderNotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn listing_filters_by_owner() {
    let store = get_test_store().await;
    let first = sample_order();
    let second = sample_order();

    store.insert(&first).await.unwrap();
    store.insert(&second).await.unwrap();

    let mine = store.list_for_user(first.user_id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, first.id);
    assert_eq!(store.list_all().await.unwrap().len(), 2);
}
