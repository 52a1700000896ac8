//! In-memory checkout store.
//!
//! Implements the same unit-of-work contract as the PostgreSQL store without
//! a database, for tests and local demos.
//!
//! ## How It Mirrors PostgreSQL
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PostgreSQL                         MemoryStore                         │
//! │  ─────────────────────────────────  ─────────────────────────────────   │
//! │  SELECT … FOR UPDATE                one tokio Mutex per product id,     │
//! │                                     owned guards taken in id order      │
//! │  lock_timeout                       tokio::time::timeout on the lock    │
//! │  uncommitted writes invisible       writes staged in the transaction    │
//! │  COMMIT                             staged writes applied in one step   │
//! │  ROLLBACK / connection drop         staged writes and guards dropped    │
//! │  CHECK (stock_quantity >= 0)        checked on decrement                │
//! │  UNIQUE (order_number)              checked on commit                   │
//! │  BIGSERIAL                          counters; ids are not reused        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Limitations
//!
//! - Single process only, nothing is persisted
//! - Plain reads (`list_orders`, `product`) never wait for row locks, like
//!   PostgreSQL's MVCC reads

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use tracing::debug;

use shopfront_core::{
    LockedProduct, NewOrder, NewOrderItem, Order, OrderDetail, OrderItem, OrderNumber, Product,
    StockDecrement,
};

use super::{CheckoutStore, CheckoutTransaction, OrderStore};
use crate::error::{DbError, DbResult};

const STOCK_CONSTRAINT: &str = "products_stock_non_negative";
const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

/// Converts a lock poison error to a database error.
fn poisoned<T>(_: PoisonError<T>) -> DbError {
    DbError::Internal("memory store lock poisoned".to_string())
}

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    items: Vec<OrderItemRow>,
    next_product_id: i64,
    next_order_id: i64,
    next_item_id: i64,
}

#[derive(Debug, Clone)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price_cents: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

#[derive(Debug)]
struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<i64, Arc<RowLock<()>>>>,
    lock_timeout: Duration,
}

impl Inner {
    fn tables(&self) -> DbResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(poisoned)
    }

    /// Row lock of an existing product. Unknown ids get no lock, so the
    /// lock table never outgrows the product table.
    fn row_lock(&self, product_id: i64) -> DbResult<Option<Arc<RowLock<()>>>> {
        if !self.tables()?.products.contains_key(&product_id) {
            return Ok(None);
        }
        let mut locks = self.row_locks.lock().map_err(poisoned)?;
        Ok(Some(
            locks
                .entry(product_id)
                .or_insert_with(|| Arc::new(RowLock::new(())))
                .clone(),
        ))
    }

    #[cfg(test)]
    fn row_lock_count(&self) -> usize {
        self.row_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

/// In-process store implementing [`CheckoutStore`] and [`OrderStore`].
///
/// Cheap to clone; clones share the same data.
///
/// ## Example
///
/// ```rust
/// use shopfront_db::store::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// let mug = store.insert_product("Ceramic Mug", 800, 5).unwrap();
/// assert_eq!(store.product(mug).unwrap().unwrap().stock_quantity, 5);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with a 5 second row lock timeout.
    pub fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        MemoryStore {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                lock_timeout,
            }),
        }
    }

    /// Adds a live product and returns its id.
    pub fn insert_product(
        &self,
        name: impl Into<String>,
        price_cents: i64,
        stock_quantity: i64,
    ) -> DbResult<i64> {
        if stock_quantity < 0 {
            return Err(DbError::CheckViolation {
                constraint: STOCK_CONSTRAINT.to_string(),
            });
        }

        let mut tables = self.inner.tables()?;
        let id = Tables::next_id(&mut tables.next_product_id);
        let now = Utc::now();
        tables.products.insert(
            id,
            Product {
                id,
                category_id: None,
                name: name.into(),
                price_cents,
                stock_quantity,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        );
        Ok(id)
    }

    /// Current committed state of a product, deleted or not.
    pub fn product(&self, product_id: i64) -> DbResult<Option<Product>> {
        Ok(self.inner.tables()?.products.get(&product_id).cloned())
    }

    /// Catalog price edit.
    pub fn set_price(&self, product_id: i64, price_cents: i64) -> DbResult<()> {
        let mut tables = self.inner.tables()?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        product.price_cents = price_cents;
        product.updated_at = Utc::now();
        Ok(())
    }

    pub fn soft_delete_product(&self, product_id: i64) -> DbResult<()> {
        let mut tables = self.inner.tables()?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        product.deleted_at = Some(Utc::now());
        Ok(())
    }

    pub fn soft_delete_order(&self, order_id: i64) -> DbResult<()> {
        let mut tables = self.inner.tables()?;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        order.deleted_at = Some(Utc::now());
        Ok(())
    }

    /// Number of committed orders, including soft-deleted ones.
    pub fn order_count(&self) -> DbResult<usize> {
        Ok(self.inner.tables()?.orders.len())
    }

    /// Number of committed order items.
    pub fn order_item_count(&self) -> DbResult<usize> {
        Ok(self.inner.tables()?.items.len())
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn CheckoutTransaction>> {
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            guards: Vec::new(),
            locked: BTreeSet::new(),
            stock_taken: BTreeMap::new(),
            orders: Vec::new(),
            items: Vec::new(),
        }))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders(&self, limit: i64) -> DbResult<Vec<Order>> {
        let tables = self.inner.tables()?;
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.deleted_at.is_none())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn get_order(&self, order_id: i64) -> DbResult<Option<OrderDetail>> {
        let tables = self.inner.tables()?;
        let Some(order) = tables.orders.get(&order_id).filter(|o| o.deleted_at.is_none()) else {
            return Ok(None);
        };

        let items = tables
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|i| OrderItem {
                id: i.id,
                order_id: i.order_id,
                product_id: i.product_id,
                product_name: tables
                    .products
                    .get(&i.product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                quantity: i.quantity,
                unit_price_cents: i.unit_price_cents,
            })
            .collect();

        Ok(Some(OrderDetail {
            order: order.clone(),
            items,
        }))
    }
}

#[derive(Debug)]
struct StagedOrder {
    id: i64,
    new: NewOrder,
    number: Option<OrderNumber>,
}

/// One open in-memory transaction.
///
/// Holds the row lock of every product it has locked until it is committed,
/// rolled back or dropped.
pub struct MemoryTransaction {
    inner: Arc<Inner>,
    guards: Vec<OwnedMutexGuard<()>>,
    locked: BTreeSet<i64>,
    /// Units taken from each product by this transaction.
    stock_taken: BTreeMap<i64, i64>,
    orders: Vec<StagedOrder>,
    items: Vec<NewOrderItem>,
}

impl MemoryTransaction {
    fn visible_stock(&self, product: &Product) -> i64 {
        product.stock_quantity - self.stock_taken.get(&product.id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CheckoutTransaction for MemoryTransaction {
    async fn lock_products(&mut self, ids: &[i64]) -> DbResult<HashMap<i64, LockedProduct>> {
        let mut ordered: Vec<i64> = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        for id in ordered.iter().copied() {
            if self.locked.contains(&id) {
                continue;
            }
            let Some(lock) = self.inner.row_lock(id)? else {
                continue;
            };
            let guard = tokio::time::timeout(self.inner.lock_timeout, lock.lock_owned())
                .await
                .map_err(|_| DbError::LockTimeout)?;
            self.guards.push(guard);
            self.locked.insert(id);
        }

        debug!(ids = ?ordered, "Row locks acquired");

        let tables = self.inner.tables()?;
        Ok(ordered
            .iter()
            .filter_map(|id| tables.products.get(id))
            .filter(|p| p.deleted_at.is_none())
            .map(|p| {
                (
                    p.id,
                    LockedProduct {
                        id: p.id,
                        name: p.name.clone(),
                        price_cents: p.price_cents,
                        stock_quantity: self.visible_stock(p),
                    },
                )
            })
            .collect())
    }

    async fn decrement_stock(&mut self, decrements: &[StockDecrement]) -> DbResult<()> {
        let tables = self.inner.tables()?;
        let mut taken = self.stock_taken.clone();

        for d in decrements {
            if !self.locked.contains(&d.product_id) {
                return Err(DbError::Internal(format!(
                    "product {} updated without holding its row lock",
                    d.product_id
                )));
            }
            let product = tables.products.get(&d.product_id).ok_or_else(|| {
                DbError::Internal(format!("stock decrement of missing product {}", d.product_id))
            })?;

            let already = taken.get(&d.product_id).copied().unwrap_or(0);
            if product.stock_quantity - already - d.quantity < 0 {
                return Err(DbError::CheckViolation {
                    constraint: STOCK_CONSTRAINT.to_string(),
                });
            }
            taken.insert(d.product_id, already + d.quantity);
        }

        drop(tables);
        self.stock_taken = taken;
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> DbResult<i64> {
        let id = {
            let mut tables = self.inner.tables()?;
            Tables::next_id(&mut tables.next_order_id)
        };
        self.orders.push(StagedOrder {
            id,
            new: order.clone(),
            number: None,
        });
        Ok(id)
    }

    async fn insert_order_items(&mut self, items: &[NewOrderItem]) -> DbResult<()> {
        let tables = self.inner.tables()?;
        for item in items {
            if !self.orders.iter().any(|o| o.id == item.order_id) {
                return Err(DbError::ForeignKeyViolation {
                    message: format!("order {} does not exist", item.order_id),
                });
            }
            if !tables.products.contains_key(&item.product_id) {
                return Err(DbError::ForeignKeyViolation {
                    message: format!("product {} does not exist", item.product_id),
                });
            }
        }
        drop(tables);

        self.items.extend_from_slice(items);
        Ok(())
    }

    async fn assign_order_number(&mut self, order_id: i64, number: &OrderNumber) -> DbResult<()> {
        let staged = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        staged.number = Some(*number);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let this = *self;
        let mut tables = this.inner.tables()?;

        for staged in &this.orders {
            if let Some(number) = staged.number {
                let text = number.to_string();
                let taken = tables
                    .orders
                    .values()
                    .any(|o| o.order_number.as_deref() == Some(text.as_str()));
                let duplicated = this
                    .orders
                    .iter()
                    .filter(|o| o.number == Some(number))
                    .count()
                    > 1;
                if taken || duplicated {
                    return Err(DbError::UniqueViolation {
                        constraint: ORDER_NUMBER_CONSTRAINT.to_string(),
                    });
                }
            }
        }

        let now = Utc::now();
        for (product_id, quantity) in &this.stock_taken {
            if let Some(product) = tables.products.get_mut(product_id) {
                product.stock_quantity -= quantity;
                product.updated_at = now;
            }
        }

        for staged in &this.orders {
            tables.orders.insert(
                staged.id,
                Order {
                    id: staged.id,
                    order_number: staged.number.map(|n| n.to_string()),
                    buyer_name: staged.new.buyer_name.clone(),
                    buyer_email: staged.new.buyer_email.clone(),
                    buyer_phone: staged.new.buyer_phone.clone(),
                    total_cents: staged.new.total_cents,
                    status: staged.new.status,
                    created_at: staged.new.placed_at,
                    updated_at: now,
                    deleted_at: None,
                },
            );
        }

        for item in &this.items {
            let id = Tables::next_id(&mut tables.next_item_id);
            tables.items.push(OrderItemRow {
                id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
            });
        }

        // Row locks are released when `this` drops, after the writes above.
        drop(tables);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::OrderStatus;

    fn new_order(total_cents: i64) -> NewOrder {
        NewOrder {
            buyer_name: "Ana".to_string(),
            buyer_email: None,
            buyer_phone: None,
            total_cents,
            status: OrderStatus::Paid,
            placed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lock_products_omits_missing_and_deleted() {
        let store = MemoryStore::new();
        let live = store.insert_product("Mug", 800, 5).unwrap();
        let gone = store.insert_product("Old Mug", 500, 5).unwrap();
        store.soft_delete_product(gone).unwrap();

        let mut tx = store.begin().await.unwrap();
        let locked = tx.lock_products(&[gone, live, 404]).await.unwrap();

        assert_eq!(locked.len(), 1);
        assert_eq!(locked[&live].stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_unknown_ids_do_not_grow_lock_table() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 5).unwrap();

        for round in 0..50 {
            let mut ids: Vec<i64> = (0..100).map(|n| 10_000 + round * 100 + n).collect();
            ids.push(mug);
            let mut tx = store.begin().await.unwrap();
            let locked = tx.lock_products(&ids).await.unwrap();
            assert_eq!(locked.len(), 1);
            tx.rollback().await.unwrap();
        }

        assert_eq!(store.inner.row_lock_count(), 1);
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 5).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[mug]).await.unwrap();
        tx.decrement_stock(&[StockDecrement { product_id: mug, quantity: 2 }])
            .await
            .unwrap();
        let order_id = tx.insert_order(&new_order(1600)).await.unwrap();

        // Another reader sees committed state only.
        assert_eq!(store.product(mug).unwrap().unwrap().stock_quantity, 5);
        assert!(store.get_order(order_id).await.unwrap().is_none());

        tx.commit().await.unwrap();
        assert_eq!(store.product(mug).unwrap().unwrap().stock_quantity, 3);
        assert!(store.get_order(order_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_drop_rolls_back_and_releases_locks() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(200));
        let mug = store.insert_product("Mug", 800, 5).unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_products(&[mug]).await.unwrap();
            tx.decrement_stock(&[StockDecrement { product_id: mug, quantity: 5 }])
                .await
                .unwrap();
            tx.insert_order(&new_order(4000)).await.unwrap();
        }

        assert_eq!(store.product(mug).unwrap().unwrap().stock_quantity, 5);
        assert_eq!(store.order_count().unwrap(), 0);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_products(&[mug]).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_locker_times_out_while_first_holds() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
        let mug = store.insert_product("Mug", 800, 5).unwrap();

        let mut first = store.begin().await.unwrap();
        first.lock_products(&[mug]).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let err = second.lock_products(&[mug]).await.unwrap_err();
        assert!(matches!(err, DbError::LockTimeout));

        first.rollback().await.unwrap();
        assert!(second.lock_products(&[mug]).await.is_ok());
    }

    #[tokio::test]
    async fn test_decrement_below_zero_is_check_violation() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 1).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[mug]).await.unwrap();
        let err = tx
            .decrement_stock(&[StockDecrement { product_id: mug, quantity: 2 }])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_decrement_requires_row_lock() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 3).unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx
            .decrement_stock(&[StockDecrement { product_id: mug, quantity: 1 }])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected_on_commit() {
        let store = MemoryStore::new();
        let number: OrderNumber = "ORD-20250101-1".parse().unwrap();

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_order(&new_order(0)).await.unwrap();
        tx.assign_order_number(id, &number).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_order(&new_order(0)).await.unwrap();
        tx.assign_order_number(id, &number).await.unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(store.order_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_items_must_reference_staged_order() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 3).unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_order_items(&[NewOrderItem {
                order_id: 99,
                product_id: mug,
                quantity: 1,
                unit_price_cents: 800,
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_without_deleted() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut tx = store.begin().await.unwrap();
            ids.push(tx.insert_order(&new_order(100)).await.unwrap());
            tx.commit().await.unwrap();
        }
        store.soft_delete_order(ids[1]).unwrap();

        let listed: Vec<i64> = store
            .list_orders(10)
            .await
            .unwrap()
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(listed, vec![ids[2], ids[0]]);

        assert_eq!(store.list_orders(1).await.unwrap().len(), 1);
        assert!(store.get_order(ids[1]).await.unwrap().is_none());
    }
}
