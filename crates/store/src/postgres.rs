use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{Money, Order, OrderItem, OrderStatus};
use sqlx::types::Json;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{AdjustOutcome, OrderRepository, Result, StockStore, StoreError};

const ORDER_COLUMNS: &str =
    "id, user_id, items, status, total_amount, address, created_at, updated_at, version";

/// PostgreSQL-backed stock store and order repository.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let corrupt = |reason: String| StoreError::CorruptRecord { order_id, reason };

        let status: String = row.try_get("status")?;
        let status: OrderStatus = status.parse().map_err(|e| corrupt(format!("{e}")))?;

        let version: i64 = row.try_get("version")?;
        let version = u64::try_from(version).map_err(|e| corrupt(format!("version: {e}")))?;

        let Json(items) = row.try_get::<Json<Vec<OrderItem>>, _>("items")?;

        Ok(Order {
            id: order_id,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            items,
            status,
            total_amount: Money::from_cents(row.try_get("total_amount")?),
            address: row.try_get("address")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            version,
        })
    }

    async fn stored_version(&self, order_id: OrderId) -> Result<Option<u64>> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(version.and_then(|v| u64::try_from(v).ok()))
    }

    /// Explains why a versioned write matched no row.
    async fn write_miss(&self, order_id: OrderId, expected: u64) -> StoreError {
        match self.stored_version(order_id).await {
            Ok(Some(actual)) => StoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            },
            Ok(None) => StoreError::OrderNotFound(order_id),
            Err(e) => e,
        }
    }
}

fn db_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

#[async_trait]
impl StockStore for PostgresStore {
    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<AdjustOutcome> {
        let mut tx = self.pool.begin().await?;

        // The row lock holds until commit, so the level read here is the one
        // the write below replaces and the one reported on a miss.
        let current: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(product_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        let Some(current) = current else {
            return Ok(AdjustOutcome::UnknownProduct);
        };

        let next = current.checked_add(delta).ok_or(StoreError::StockOverflow {
            product_id: product_id.clone(),
            stock: current,
            delta,
        })?;
        if next < 0 {
            return Ok(AdjustOutcome::Insufficient { available: current });
        }

        sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id.as_str())
            .bind(next)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(AdjustOutcome::Applied { stock: next })
    }

    async fn stock(&self, product_id: &ProductId) -> Result<Option<i64>> {
        let stock = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(stock)
    }

    async fn set_stock(&self, product_id: &ProductId, stock: i64) -> Result<()> {
        if stock < 0 {
            return Err(StoreError::InvalidStock {
                product_id: product_id.clone(),
                stock,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO products (id, stock) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET stock = EXCLUDED.stock, updated_at = NOW()
            "#,
        )
        .bind(product_id.as_str())
        .bind(stock)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, items, status, total_amount, address, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(Json(&order.items))
        .bind(order.status.as_str())
        .bind(order.total_amount.cents())
        .bind(&order.address)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(db_version(order.version))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateOrder(order.id);
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn save(&self, mut order: Order) -> Result<Order> {
        let saved: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE orders
            SET items = $2, status = $3, total_amount = $4, address = $5,
                updated_at = $6, version = version + 1
            WHERE id = $1 AND version = $7
            RETURNING version
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(Json(&order.items))
        .bind(order.status.as_str())
        .bind(order.total_amount.cents())
        .bind(&order.address)
        .bind(order.updated_at)
        .bind(db_version(order.version))
        .fetch_optional(&self.pool)
        .await?;

        match saved {
            Some(_) => {
                order.version += 1;
                Ok(order)
            }
            None => Err(self.write_miss(order.id, order.version).await),
        }
    }

    async fn delete(&self, order_id: OrderId, expected_version: u64) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND version = $2")
            .bind(order_id.as_uuid())
            .bind(db_version(expected_version))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.write_miss(order_id, expected_version).await);
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}
