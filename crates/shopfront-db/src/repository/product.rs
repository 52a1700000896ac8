//! # Product Repository
//!
//! Catalog reads and writes outside of checkout.
//!
//! Checkout never goes through here: it reads products only under row
//! locks, via [`crate::store::CheckoutTransaction::lock_products`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use shopfront_core::Product;

use crate::error::DbResult;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let id = repo.insert(&NewProduct::new("Mug", 800, 25)).await?;
/// let product = repo.get_by_id(id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

/// A product row to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: Option<i64>,
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price_cents: i64, stock_quantity: i64) -> Self {
        NewProduct {
            category_id: None,
            name: name.into(),
            price_cents,
            stock_quantity,
        }
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

#[derive(sqlx::FromRow)]
struct ProductRecord {
    id: i64,
    category_id: Option<i64>,
    name: String,
    price_cents: i64,
    stock_quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        Product {
            id: r.id,
            category_id: r.category_id,
            name: r.name,
            price_cents: r.price_cents,
            stock_quantity: r.stock_quantity,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        }
    }
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: PgPool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID, including soft-deleted ones.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let record: Option<ProductRecord> = sqlx::query_as(
            r#"
            SELECT id, category_id, name, price_cents, stock_quantity,
                   created_at, updated_at, deleted_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Product::from))
    }

    /// Counts live products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Inserts a category and returns its id.
    pub async fn insert_category(&self, name: &str) -> DbResult<i64> {
        let id: i64 = sqlx::query_scalar("INSERT INTO categories (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Inserts a product and returns its id.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<i64> {
        debug!(name = %product.name, stock = product.stock_quantity, "Inserting product");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (category_id, name, price_cents, stock_quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(product.category_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Catalog price edit. Placed orders keep the price they were sold at.
    pub async fn update_price(&self, id: i64, price_cents: i64) -> DbResult<()> {
        sqlx::query("UPDATE products SET price_cents = $1, updated_at = NOW() WHERE id = $2")
            .bind(price_cents)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Soft-deletes a product. Checkout treats it as not found afterwards.
    pub async fn soft_delete(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE products SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
