//! # Checkout Coordinator
//!
//! Turns a checkout request into a paid order inside one transaction.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CheckoutService::checkout                        │
//! │                                                                         │
//! │  1. validate_checkout(request)     ── fails? 400, no transaction opened │
//! │  2. store.begin()                                                       │
//! │  3. lock_products(distinct ids)    ── rows locked in ascending id order │
//! │  4. plan_checkout(lines, locked)   ── missing? 404  short? 409          │
//! │  5. decrement_stock(plan)                                               │
//! │  6. insert_order(PAID, total)      ── order id                          │
//! │  7. insert_order_items(snapshot prices)                                 │
//! │  8. assign_order_number(ORD-YYYYMMDD-<id>)                              │
//! │  9. commit                                                              │
//! │                                                                         │
//! │  Any failure in 3-9 ── rollback, nothing from this request persists     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stock check reads values taken under the row locks of step 3, so
//! two overlapping checkouts serialize on the products they share and the
//! second one sees the first one's decrement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use shopfront_core::checkout::distinct_product_ids;
use shopfront_core::validation::validate_checkout;
use shopfront_core::{
    plan_checkout, CheckoutRequest, CoreError, NewOrder, OrderNumber, OrderStatus, PlacedOrder,
    ValidatedCheckout, ValidationError, ValidationErrors,
};

use crate::error::DbError;
use crate::store::{CheckoutStore, CheckoutTransaction};

// =============================================================================
// Errors
// =============================================================================

/// Why a checkout did not produce an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request is malformed. Nothing was read or written.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A requested product does not exist or was deleted.
    #[error("Product not found: {product_id}")]
    NotFound { product_id: i64 },

    /// A product's stock does not cover the requested quantity.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    Conflict {
        product_id: i64,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The database failed. The transaction was rolled back.
    #[error("Could not create the order: {0}")]
    Persistence(#[from] DbError),
}

impl From<CoreError> for CheckoutError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(product_id) => CheckoutError::NotFound { product_id },
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => CheckoutError::Conflict {
                product_id,
                name,
                available,
                requested,
            },
            CoreError::AmountOverflow => CheckoutError::Validation(ValidationErrors::from(
                ValidationError::InvalidFormat {
                    field: "items".to_string(),
                    reason: "order total exceeds the supported amount".to_string(),
                },
            )),
            CoreError::Validation(errors) => CheckoutError::Validation(errors),
        }
    }
}

impl CheckoutError {
    /// True for failures caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CheckoutError::Persistence(_))
    }
}

// =============================================================================
// Service
// =============================================================================

/// Coordinates checkouts over a [`CheckoutStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    clock: fn() -> DateTime<Utc>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn CheckoutStore>) -> Self {
        CheckoutService {
            store,
            clock: Utc::now,
        }
    }

    /// Replaces the clock that stamps orders and dates their numbers.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Places one order.
    ///
    /// ## Errors
    /// - [`CheckoutError::Validation`] - request rejected before any database work
    /// - [`CheckoutError::NotFound`] - first requested product with no live row
    /// - [`CheckoutError::Conflict`] - first product, in request order, whose
    ///   total demand exceeds its stock
    /// - [`CheckoutError::Persistence`] - database failure, including lock and
    ///   statement timeouts
    ///
    /// On every error nothing from this request is persisted.
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<PlacedOrder, CheckoutError> {
        let valid = validate_checkout(request)?;

        match self.transact(&valid).await {
            Ok(placed) => {
                info!(
                    order_id = placed.order_id,
                    order_number = %placed.order_number,
                    total_cents = placed.total_cents,
                    lines = valid.lines.len(),
                    "Order placed"
                );
                Ok(placed)
            }
            Err(err) => {
                log_failure(&err);
                Err(err)
            }
        }
    }

    async fn transact(&self, valid: &ValidatedCheckout) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.store.begin().await?;

        match self.run(tx.as_mut(), valid).await {
            Ok(placed) => {
                tx.commit().await?;
                Ok(placed)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed checkout did not complete");
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        tx: &mut dyn CheckoutTransaction,
        valid: &ValidatedCheckout,
    ) -> Result<PlacedOrder, CheckoutError> {
        let ids = distinct_product_ids(&valid.lines);
        let locked = tx.lock_products(&ids).await?;
        debug!(requested = ids.len(), found = locked.len(), "Products locked");

        let plan = plan_checkout(&valid.lines, &locked)?;

        tx.decrement_stock(&plan.decrements).await?;

        let placed_at = (self.clock)();
        let order_id = tx
            .insert_order(&NewOrder {
                buyer_name: valid.buyer.name.clone(),
                buyer_email: valid.buyer.email.clone(),
                buyer_phone: valid.buyer.phone.clone(),
                total_cents: plan.total.cents(),
                status: OrderStatus::Paid,
                placed_at,
            })
            .await?;

        tx.insert_order_items(&plan.order_items(order_id)).await?;

        let number = OrderNumber::new(placed_at.date_naive(), order_id);
        tx.assign_order_number(order_id, &number).await?;

        Ok(PlacedOrder {
            order_id,
            order_number: number.to_string(),
            total_cents: plan.total.cents(),
        })
    }
}

fn log_failure(err: &CheckoutError) {
    match err {
        CheckoutError::Validation(_) => debug!(error = %err, "Checkout rejected"),
        CheckoutError::NotFound { product_id } => {
            info!(product_id, "Checkout rejected: product not found")
        }
        CheckoutError::Conflict {
            product_id,
            available,
            requested,
            ..
        } => info!(
            product_id,
            available, requested, "Checkout rejected: insufficient stock"
        ),
        CheckoutError::Persistence(db) if db.is_contention() => {
            warn!(error = %db, "Checkout aborted under contention")
        }
        CheckoutError::Persistence(db) => error!(error = %db, "Checkout failed"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use shopfront_core::{Buyer, CheckoutLine, LockedProduct, NewOrderItem, StockDecrement};

    use super::*;
    use crate::error::DbResult;
    use crate::store::memory::MemoryStore;
    use crate::store::OrderStore;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    fn service(store: &MemoryStore) -> CheckoutService {
        CheckoutService::new(Arc::new(store.clone())).with_clock(fixed_clock)
    }

    fn request(lines: &[(i64, i64)]) -> CheckoutRequest {
        CheckoutRequest {
            buyer: Buyer {
                name: "Ana Lima".to_string(),
                email: Some("ana@example.com".to_string()),
                phone: None,
            },
            items: lines
                .iter()
                .map(|&(id, qty)| CheckoutLine::new(id, qty))
                .collect(),
        }
    }

    fn stock(store: &MemoryStore, id: i64) -> i64 {
        store.product(id).unwrap().unwrap().stock_quantity
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_decrements_stock() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 10).unwrap();
        let tee = store.insert_product("T-Shirt", 2500, 4).unwrap();
        let lamp = store.insert_product("Lamp", 4000, 6).unwrap();

        let placed = service(&store)
            .checkout(&request(&[(mug, 3), (tee, 1)]))
            .await
            .unwrap();

        assert_eq!(placed.total_cents, 3 * 800 + 2500);
        assert_eq!(
            placed.order_number,
            format!("ORD-20250314-{}", placed.order_id)
        );
        assert_eq!(stock(&store, mug), 7);
        assert_eq!(stock(&store, tee), 3);
        assert_eq!(stock(&store, lamp), 6);

        let detail = store.get_order(placed.order_id).await.unwrap().unwrap();
        assert_eq!(detail.order.status, OrderStatus::Paid);
        assert_eq!(detail.order.total_cents, placed.total_cents);
        assert_eq!(detail.order.order_number.as_deref(), Some(placed.order_number.as_str()));
        assert_eq!(detail.order.created_at, fixed_clock());
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].unit_price_cents, 800);
        assert_eq!(detail.items[1].quantity, 1);
    }

    #[tokio::test]
    async fn test_two_concurrent_checkouts_cannot_oversell() {
        let store = MemoryStore::new();
        let lamp = store.insert_product("Lamp", 4000, 5).unwrap();
        let svc = service(&store);

        let a = tokio::spawn({
            let svc = svc.clone();
            async move { svc.checkout(&request(&[(lamp, 3)])).await }
        });
        let b = tokio::spawn({
            let svc = svc.clone();
            async move { svc.checkout(&request(&[(lamp, 3)])).await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CheckoutError::Conflict { available: 2, requested: 3, .. })))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(stock(&store, lamp), 2);
        assert_eq!(store.order_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_checkout_of_other_products_proceeds_while_a_row_is_held() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
        let mug = store.insert_product("Mug", 800, 10).unwrap();
        let tee = store.insert_product("T-Shirt", 2500, 4).unwrap();

        let mut holder = store.begin().await.unwrap();
        holder.lock_products(&[mug]).await.unwrap();

        let placed = service(&store)
            .checkout(&request(&[(tee, 2)]))
            .await
            .unwrap();

        assert_eq!(stock(&store, tee), 2);
        assert!(store.get_order(placed.order_id).await.unwrap().is_some());

        holder.rollback().await.unwrap();
        assert_eq!(stock(&store, mug), 10);
    }

    #[tokio::test]
    async fn test_many_concurrent_checkouts_sell_exactly_the_stock() {
        let store = MemoryStore::new();
        let pen = store.insert_product("Pen", 150, 7).unwrap();
        let svc = service(&store);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.checkout(&request(&[(pen, 1)])).await })
            })
            .collect();

        let mut sold = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                sold += 1;
            }
        }

        assert_eq!(sold, 7);
        assert_eq!(stock(&store, pen), 0);
    }

    #[tokio::test]
    async fn test_short_last_line_leaves_everything_untouched() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 10).unwrap();
        let tee = store.insert_product("T-Shirt", 2500, 1).unwrap();

        let err = service(&store)
            .checkout(&request(&[(mug, 2), (tee, 2)]))
            .await
            .unwrap_err();

        match err {
            CheckoutError::Conflict {
                product_id,
                name,
                available,
                requested,
            } => {
                assert_eq!(product_id, tee);
                assert_eq!(name, "T-Shirt");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(stock(&store, mug), 10);
        assert_eq!(stock(&store, tee), 1);
        assert_eq!(store.order_count().unwrap(), 0);
        assert_eq!(store.order_item_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 10).unwrap();

        let err = service(&store)
            .checkout(&request(&[(mug, 1), (9999, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::NotFound { product_id: 9999 }));
        assert_eq!(stock(&store, mug), 10);
        assert_eq!(store.order_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleted_product_is_not_found() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 10).unwrap();
        store.soft_delete_product(mug).unwrap();

        let err = service(&store)
            .checkout(&request(&[(mug, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::NotFound { product_id } if product_id == mug));
    }

    #[tokio::test]
    async fn test_duplicate_lines_count_against_the_same_stock() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 4).unwrap();

        let err = service(&store)
            .checkout(&request(&[(mug, 3), (mug, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Conflict { available: 4, requested: 5, .. }
        ));

        let placed = service(&store)
            .checkout(&request(&[(mug, 2), (mug, 2)]))
            .await
            .unwrap();
        assert_eq!(stock(&store, mug), 0);

        let detail = store.get_order(placed.order_id).await.unwrap().unwrap();
        assert_eq!(detail.items.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_request_never_opens_a_transaction() {
        struct CountingStore {
            inner: MemoryStore,
            begins: AtomicUsize,
        }

        #[async_trait]
        impl CheckoutStore for CountingStore {
            async fn begin(&self) -> DbResult<Box<dyn CheckoutTransaction>> {
                self.begins.fetch_add(1, Ordering::SeqCst);
                self.inner.begin().await
            }
        }

        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            begins: AtomicUsize::new(0),
        });
        let svc = CheckoutService::new(store.clone());

        let mut bad = request(&[(1, 0)]);
        bad.buyer.name = " ".to_string();

        let err = svc.checkout(&bad).await.unwrap_err();
        match err {
            CheckoutError::Validation(errors) => {
                assert!(errors.has_field("buyer.name"));
                assert!(errors.has_field("items[0].quantity"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.begins.load(Ordering::SeqCst), 0);

        let err = svc.checkout(&request(&[])).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(store.begins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_later_price_change_does_not_touch_placed_order() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 10).unwrap();

        let placed = service(&store)
            .checkout(&request(&[(mug, 2)]))
            .await
            .unwrap();
        store.set_price(mug, 1200).unwrap();

        let detail = store.get_order(placed.order_id).await.unwrap().unwrap();
        assert_eq!(detail.items[0].unit_price_cents, 800);
        assert_eq!(detail.order.total_cents, 1600);
    }

    #[tokio::test]
    async fn test_resubmission_creates_a_second_order() {
        let store = MemoryStore::new();
        let mug = store.insert_product("Mug", 800, 10).unwrap();
        let svc = service(&store);

        let first = svc.checkout(&request(&[(mug, 1)])).await.unwrap();
        let second = svc.checkout(&request(&[(mug, 1)])).await.unwrap();

        assert_ne!(first.order_id, second.order_id);
        assert_ne!(first.order_number, second.order_number);
        assert_eq!(stock(&store, mug), 8);
    }

    #[tokio::test]
    async fn test_amount_overflow_is_a_validation_error() {
        let store = MemoryStore::new();
        let gold = store.insert_product("Gold Bar", i64::MAX / 2, 10).unwrap();

        let err = service(&store)
            .checkout(&request(&[(gold, 3)]))
            .await
            .unwrap_err();

        match err {
            CheckoutError::Validation(errors) => assert!(errors.has_field("items")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(stock(&store, gold), 10);
    }

    #[tokio::test]
    async fn test_lock_timeout_is_persistence_error() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
        let mug = store.insert_product("Mug", 800, 10).unwrap();

        let mut holder = store.begin().await.unwrap();
        holder.lock_products(&[mug]).await.unwrap();

        let err = service(&store)
            .checkout(&request(&[(mug, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Persistence(DbError::LockTimeout)));
        assert!(!err.is_client_error());

        holder.rollback().await.unwrap();
        assert!(service(&store).checkout(&request(&[(mug, 1)])).await.is_ok());
    }

    /// Delegates to a memory transaction but fails on the chosen step.
    struct FailingStore {
        inner: MemoryStore,
        fail_at: Step,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Step {
        InsertItems,
        AssignNumber,
    }

    struct FailingTransaction {
        inner: Box<dyn CheckoutTransaction>,
        fail_at: Step,
    }

    #[async_trait]
    impl CheckoutStore for FailingStore {
        async fn begin(&self) -> DbResult<Box<dyn CheckoutTransaction>> {
            Ok(Box::new(FailingTransaction {
                inner: self.inner.begin().await?,
                fail_at: self.fail_at,
            }))
        }
    }

    #[async_trait]
    impl CheckoutTransaction for FailingTransaction {
        async fn lock_products(&mut self, ids: &[i64]) -> DbResult<HashMap<i64, LockedProduct>> {
            self.inner.lock_products(ids).await
        }

        async fn decrement_stock(&mut self, decrements: &[StockDecrement]) -> DbResult<()> {
            self.inner.decrement_stock(decrements).await
        }

        async fn insert_order(&mut self, order: &NewOrder) -> DbResult<i64> {
            self.inner.insert_order(order).await
        }

        async fn insert_order_items(&mut self, items: &[NewOrderItem]) -> DbResult<()> {
            if self.fail_at == Step::InsertItems {
                return Err(DbError::QueryFailed("connection reset".to_string()));
            }
            self.inner.insert_order_items(items).await
        }

        async fn assign_order_number(
            &mut self,
            order_id: i64,
            number: &OrderNumber,
        ) -> DbResult<()> {
            if self.fail_at == Step::AssignNumber {
                return Err(DbError::UniqueViolation {
                    constraint: "orders_order_number_key".to_string(),
                });
            }
            self.inner.assign_order_number(order_id, number).await
        }

        async fn commit(self: Box<Self>) -> DbResult<()> {
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> DbResult<()> {
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn test_failure_after_writes_rolls_back_every_step() {
        for fail_at in [Step::InsertItems, Step::AssignNumber] {
            let store = MemoryStore::new();
            let mug = store.insert_product("Mug", 800, 10).unwrap();
            let svc = CheckoutService::new(Arc::new(FailingStore {
                inner: store.clone(),
                fail_at,
            }));

            let err = svc.checkout(&request(&[(mug, 4)])).await.unwrap_err();

            assert!(matches!(err, CheckoutError::Persistence(_)));
            assert_eq!(stock(&store, mug), 10);
            assert_eq!(store.order_count().unwrap(), 0);
            assert_eq!(store.order_item_count().unwrap(), 0);
        }
    }

    #[test]
    fn test_core_error_mapping() {
        let err: CheckoutError = CoreError::ProductNotFound(7).into();
        assert!(matches!(err, CheckoutError::NotFound { product_id: 7 }));
        assert!(err.is_client_error());

        let err: CheckoutError = CoreError::InsufficientStock {
            product_id: 3,
            name: "Mug".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Mug: available 1, requested 2"
        );
    }
}
