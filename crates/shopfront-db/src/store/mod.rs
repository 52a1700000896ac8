//! # Checkout Store
//!
//! The unit-of-work seam the checkout coordinator runs on.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  store.begin() ──► Box<dyn CheckoutTransaction>  (one DB transaction)  │
//! │                        │                                                │
//! │                        ├── lock_products(ids)      SELECT … FOR UPDATE │
//! │                        ├── decrement_stock(plan)                        │
//! │                        ├── insert_order(new)   ──► order id             │
//! │                        ├── insert_order_items(items)                    │
//! │                        ├── assign_order_number(id, number)              │
//! │                        │                                                │
//! │                        ├── commit()   ──► everything visible at once    │
//! │                        ├── rollback() ──► nothing visible               │
//! │                        └── drop       ──► same as rollback              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every read and write of one checkout goes through the same handle, and the
//! handle is consumed by `commit`/`rollback`, so nothing can touch the
//! transaction after it ends.
//!
//! ## Implementations
//! - [`postgres::PgCheckoutStore`] - production, PostgreSQL row locks
//! - [`memory::MemoryStore`] - in-process, for tests and local demos

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use shopfront_core::{
    LockedProduct, NewOrder, NewOrderItem, Order, OrderDetail, OrderNumber, StockDecrement,
};

use crate::error::DbResult;

/// Opens checkout transactions.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Starts a new transaction.
    async fn begin(&self) -> DbResult<Box<dyn CheckoutTransaction>>;
}

/// One open checkout transaction.
#[async_trait]
pub trait CheckoutTransaction: Send {
    /// Takes an exclusive lock on every live product in `ids` and returns
    /// its price, stock and name as read under that lock.
    ///
    /// Locks are taken in ascending id order and held until the transaction
    /// ends. Ids with no live row are absent from the result.
    async fn lock_products(&mut self, ids: &[i64]) -> DbResult<HashMap<i64, LockedProduct>>;

    /// Subtracts each decrement from its product's stock.
    async fn decrement_stock(&mut self, decrements: &[StockDecrement]) -> DbResult<()>;

    /// Inserts the order row and returns its generated id.
    async fn insert_order(&mut self, order: &NewOrder) -> DbResult<i64>;

    async fn insert_order_items(&mut self, items: &[NewOrderItem]) -> DbResult<()>;

    /// Sets the display number of an order inserted in this transaction.
    async fn assign_order_number(&mut self, order_id: i64, number: &OrderNumber) -> DbResult<()>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Read-only access to committed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Newest first, soft-deleted orders excluded, at most `limit` rows.
    async fn list_orders(&self, limit: i64) -> DbResult<Vec<Order>>;

    /// One order with its items. `None` if missing or soft-deleted.
    async fn get_order(&self, order_id: i64) -> DbResult<Option<OrderDetail>>;
}
