//! # PostgreSQL Checkout Store
//!
//! Runs each checkout inside one `sqlx::Transaction`.
//!
//! ## Row Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout A (ids 3, 7)              Checkout B (ids 7, 9)               │
//! │       │                                  │                              │
//! │  SELECT … WHERE id = ANY('{3,7}')        │                              │
//! │  ORDER BY id FOR UPDATE                  │                              │
//! │       │  (holds 3, 7)               SELECT … ANY('{7,9}') FOR UPDATE    │
//! │       │                                  │  locks 7? ── waits on A      │
//! │  UPDATE stock, INSERT order …            │                              │
//! │  COMMIT ── releases 3, 7 ──────────────► │  reads 7 AFTER A's decrement │
//! │                                          ▼                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `lock_timeout` / `statement_timeout` are set with `set_config(..., true)`,
//! so they apply to this transaction only and reset when it ends.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use shopfront_core::{LockedProduct, NewOrder, NewOrderItem, OrderNumber, StockDecrement};

use super::{CheckoutStore, CheckoutTransaction};
use crate::error::{DbError, DbResult};

/// Checkout store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
    lock_timeout: Duration,
    statement_timeout: Duration,
}

impl PgCheckoutStore {
    pub fn new(pool: PgPool, lock_timeout: Duration, statement_timeout: Duration) -> Self {
        PgCheckoutStore {
            pool,
            lock_timeout,
            statement_timeout,
        }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn begin(&self) -> DbResult<Box<dyn CheckoutTransaction>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "SELECT set_config('lock_timeout', $1, true), set_config('statement_timeout', $2, true)",
        )
        .bind(format!("{}ms", self.lock_timeout.as_millis()))
        .bind(format!("{}ms", self.statement_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;

        debug!("Checkout transaction started");

        Ok(Box::new(PgCheckoutTransaction { tx }))
    }
}

/// One checkout's PostgreSQL transaction. Dropping it uncommitted rolls back.
pub struct PgCheckoutTransaction {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct LockedProductRecord {
    id: i64,
    name: String,
    price_cents: i64,
    stock_quantity: i64,
}

impl From<LockedProductRecord> for LockedProduct {
    fn from(r: LockedProductRecord) -> Self {
        LockedProduct {
            id: r.id,
            name: r.name,
            price_cents: r.price_cents,
            stock_quantity: r.stock_quantity,
        }
    }
}

#[async_trait]
impl CheckoutTransaction for PgCheckoutTransaction {
    async fn lock_products(&mut self, ids: &[i64]) -> DbResult<HashMap<i64, LockedProduct>> {
        debug!(ids = ?ids, "Locking product rows");

        // One statement for the whole id set, rows locked in id order.
        let rows: Vec<LockedProductRecord> = sqlx::query_as(
            r#"
            SELECT id, name, price_cents, stock_quantity
            FROM products
            WHERE id = ANY($1) AND deleted_at IS NULL
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.id, LockedProduct::from(r)))
            .collect())
    }

    async fn decrement_stock(&mut self, decrements: &[StockDecrement]) -> DbResult<()> {
        if decrements.is_empty() {
            return Ok(());
        }

        let product_ids: Vec<i64> = decrements.iter().map(|d| d.product_id).collect();
        let quantities: Vec<i64> = decrements.iter().map(|d| d.quantity).collect();

        let result = sqlx::query(
            r#"
            UPDATE products AS p
            SET stock_quantity = p.stock_quantity - d.quantity,
                updated_at = NOW()
            FROM UNNEST($1::bigint[], $2::bigint[]) AS d(product_id, quantity)
            WHERE p.id = d.product_id
            "#,
        )
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != decrements.len() as u64 {
            return Err(DbError::Internal(format!(
                "stock decrement touched {} of {} products",
                result.rows_affected(),
                decrements.len()
            )));
        }

        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> DbResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                buyer_name, buyer_email, buyer_phone, total_cents, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(&order.buyer_name)
        .bind(&order.buyer_email)
        .bind(&order.buyer_phone)
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(order.placed_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn insert_order_items(&mut self, items: &[NewOrderItem]) -> DbResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let order_ids: Vec<i64> = items.iter().map(|i| i.order_id).collect();
        let product_ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
        let quantities: Vec<i64> = items.iter().map(|i| i.quantity).collect();
        let unit_prices: Vec<i64> = items.iter().map(|i| i.unit_price_cents).collect();

        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
            SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::bigint[])
            "#,
        )
        .bind(&order_ids)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&unit_prices)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn assign_order_number(&mut self, order_id: i64, number: &OrderNumber) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET order_number = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(number.to_string())
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let PgCheckoutTransaction { tx } = *self;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let PgCheckoutTransaction { tx } = *self;
        if let Err(e) = tx.rollback().await {
            // The connection is discarded by the pool; the server ends the
            // transaction when the session closes.
            warn!(error = %e, "Explicit rollback failed");
            return Err(DbError::TransactionFailed(e.to_string()));
        }
        Ok(())
    }
}
