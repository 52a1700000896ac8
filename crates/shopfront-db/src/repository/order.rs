//! # Order Repository
//!
//! Read access to committed orders for the admin surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use shopfront_core::{Order, OrderDetail, OrderItem, OrderStatus};

use crate::error::{DbError, DbResult};
use crate::store::OrderStore;

/// Repository for order reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRecord {
    id: i64,
    order_number: Option<String>,
    buyer_name: String,
    buyer_email: Option<String>,
    buyer_phone: Option<String>,
    total_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRecord> for Order {
    type Error = DbError;

    fn try_from(r: OrderRecord) -> Result<Self, Self::Error> {
        let status: OrderStatus = r
            .status
            .parse()
            .map_err(|e: String| DbError::Internal(format!("order {}: {e}", r.id)))?;

        Ok(Order {
            id: r.id,
            order_number: r.order_number,
            buyer_name: r.buyer_name,
            buyer_email: r.buyer_email,
            buyer_phone: r.buyer_phone,
            total_cents: r.total_cents,
            status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRecord {
    id: i64,
    order_id: i64,
    product_id: i64,
    product_name: String,
    quantity: i64,
    unit_price_cents: i64,
}

impl From<OrderItemRecord> for OrderItem {
    fn from(r: OrderItemRecord) -> Self {
        OrderItem {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            product_name: r.product_name,
            quantity: r.quantity,
            unit_price_cents: r.unit_price_cents,
        }
    }
}

const ORDER_COLUMNS: &str = r#"
    id, order_number, buyer_name, buyer_email, buyer_phone,
    total_cents, status, created_at, updated_at, deleted_at
"#;

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: PgPool) -> Self {
        OrderRepository { pool }
    }

    /// Number of live orders.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn list_orders(&self, limit: i64) -> DbResult<Vec<Order>> {
        debug!(limit, "Listing orders");

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE deleted_at IS NULL ORDER BY id DESC LIMIT $1"
        );
        let rows: Vec<OrderRecord> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get_order(&self, order_id: i64) -> DbResult<Option<OrderDetail>> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL");
        let Some(record) = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items: Vec<OrderItemRecord> = sqlx::query_as(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name,
                   oi.quantity, oi.unit_price_cents
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderDetail {
            order: Order::try_from(record)?,
            items: items.into_iter().map(OrderItem::from).collect(),
        }))
    }
}
