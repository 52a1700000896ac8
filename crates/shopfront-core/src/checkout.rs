//! # Checkout Planning
//!
//! The decision half of a checkout. Given the requested lines and the
//! product rows the database just locked, decide whether the order can be
//! placed and what it costs. Nothing here touches storage; the caller applies
//! the resulting plan inside the same transaction that holds the locks.
//!
//! ```text
//! lines ─┐
//!        ├─► plan_checkout ─┬─► Err(ProductNotFound)     (id not locked)
//! locked ┘                  ├─► Err(InsufficientStock)   (demand > stock)
//!                           └─► Ok(CheckoutPlan)
//!                                 ├── lines      (unit price from the lock)
//!                                 ├── decrements (one per product, id order)
//!                                 └── total
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CheckoutLine, LockedProduct, NewOrderItem};

/// A requested line resolved against its locked product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PlannedLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Total units to take off one product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: i64,
    pub quantity: i64,
}

/// Everything a checkout writes, computed before the first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    /// One entry per requested line, in request order.
    pub lines: Vec<PlannedLine>,
    /// One entry per distinct product, ascending id.
    pub decrements: Vec<StockDecrement>,
    pub total: Money,
}

impl CheckoutPlan {
    /// Item rows for the order with id `order_id`.
    pub fn order_items(&self, order_id: i64) -> Vec<NewOrderItem> {
        self.lines
            .iter()
            .map(|line| NewOrderItem {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
            })
            .collect()
    }
}

/// The distinct product ids referenced by `lines`, ascending.
///
/// This is the set a checkout locks, and ascending order is the lock
/// acquisition order.
pub fn distinct_product_ids(lines: &[CheckoutLine]) -> Vec<i64> {
    let mut ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Resolves `lines` against `locked` and checks stock.
///
/// ## Rules
/// - Any requested id missing from `locked` fails with
///   [`CoreError::ProductNotFound`] for the first such line.
/// - Demand for a product is summed across all of its lines before it is
///   compared with stock; the first product (in request order) whose demand
///   exceeds its stock fails with [`CoreError::InsufficientStock`].
/// - Unit prices come from `locked` and nowhere else.
///
/// ```rust
/// use std::collections::HashMap;
/// use shopfront_core::checkout::plan_checkout;
/// use shopfront_core::types::{CheckoutLine, LockedProduct};
///
/// let mut locked = HashMap::new();
/// locked.insert(1, LockedProduct { id: 1, name: "Mug".into(), price_cents: 800, stock_quantity: 5 });
///
/// let plan = plan_checkout(&[CheckoutLine::new(1, 3)], &locked).unwrap();
/// assert_eq!(plan.total.cents(), 2400);
/// assert_eq!(plan.decrements[0].quantity, 3);
/// ```
pub fn plan_checkout(
    lines: &[CheckoutLine],
    locked: &HashMap<i64, LockedProduct>,
) -> CoreResult<CheckoutPlan> {
    let mut planned = Vec::with_capacity(lines.len());
    for line in lines {
        let product = locked
            .get(&line.product_id)
            .ok_or(CoreError::ProductNotFound(line.product_id))?;

        planned.push(PlannedLine {
            product_id: product.id,
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price(),
        });
    }

    let mut demand: BTreeMap<i64, i64> = BTreeMap::new();
    for line in &planned {
        let entry = demand.entry(line.product_id).or_insert(0);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or(CoreError::AmountOverflow)?;
    }

    for line in &planned {
        let requested = demand[&line.product_id];
        let product = &locked[&line.product_id];
        if product.stock_quantity < requested {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                available: product.stock_quantity,
                requested,
            });
        }
    }

    let mut total = Money::zero();
    for line in &planned {
        let line_total = line
            .unit_price
            .checked_multiply_quantity(line.quantity)
            .ok_or(CoreError::AmountOverflow)?;
        total = total
            .checked_add(line_total)
            .ok_or(CoreError::AmountOverflow)?;
    }

    let decrements = demand
        .into_iter()
        .map(|(product_id, quantity)| StockDecrement {
            product_id,
            quantity,
        })
        .collect();

    Ok(CheckoutPlan {
        lines: planned,
        decrements,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(products: &[(i64, &str, i64, i64)]) -> HashMap<i64, LockedProduct> {
        products
            .iter()
            .map(|&(id, name, price_cents, stock_quantity)| {
                (
                    id,
                    LockedProduct {
                        id,
                        name: name.to_string(),
                        price_cents,
                        stock_quantity,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_distinct_ids_sorted_and_deduplicated() {
        let lines = [
            CheckoutLine::new(9, 1),
            CheckoutLine::new(2, 1),
            CheckoutLine::new(9, 4),
        ];
        assert_eq!(distinct_product_ids(&lines), vec![2, 9]);
    }

    #[test]
    fn test_plan_totals_and_decrements() {
        let locked = locked(&[(1, "Mug", 800, 5), (2, "Tea", 350, 10)]);
        let lines = [CheckoutLine::new(2, 4), CheckoutLine::new(1, 1)];

        let plan = plan_checkout(&lines, &locked).unwrap();

        assert_eq!(plan.total, Money::from_cents(4 * 350 + 800));
        assert_eq!(plan.lines[0].name, "Tea");
        assert_eq!(plan.lines[0].line_total().cents(), 1400);
        assert_eq!(
            plan.decrements,
            vec![
                StockDecrement { product_id: 1, quantity: 1 },
                StockDecrement { product_id: 2, quantity: 4 },
            ]
        );

        let items = plan.order_items(77);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].order_id, 77);
        assert_eq!(items[0].unit_price_cents, 350);
    }

    #[test]
    fn test_missing_product_is_not_found() {
        let locked = locked(&[(1, "Mug", 800, 5)]);
        let lines = [CheckoutLine::new(1, 1), CheckoutLine::new(99999, 1)];

        let err = plan_checkout(&lines, &locked).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(99999)));
    }

    #[test]
    fn test_zero_stock_is_conflict() {
        let locked = locked(&[(3, "Lamp", 2500, 0)]);

        let err = plan_checkout(&[CheckoutLine::new(3, 1)], &locked).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => {
                assert_eq!(product_id, 3);
                assert_eq!(name, "Lamp");
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_split_lines_cannot_oversell() {
        // Each line alone fits in stock 5, together they do not.
        let locked = locked(&[(1, "Mug", 800, 5)]);
        let lines = [CheckoutLine::new(1, 3), CheckoutLine::new(1, 3)];

        let err = plan_checkout(&lines, &locked).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { requested: 6, available: 5, .. }
        ));
    }

    #[test]
    fn test_exact_stock_is_allowed() {
        let locked = locked(&[(1, "Mug", 800, 5)]);
        let lines = [CheckoutLine::new(1, 2), CheckoutLine::new(1, 3)];

        let plan = plan_checkout(&lines, &locked).unwrap();
        assert_eq!(plan.decrements, vec![StockDecrement { product_id: 1, quantity: 5 }]);
        assert_eq!(plan.lines.len(), 2);
    }

    #[test]
    fn test_total_overflow_is_reported() {
        let locked = locked(&[(1, "Yacht", i64::MAX / 2, 10)]);

        let err = plan_checkout(&[CheckoutLine::new(1, 3)], &locked).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow));
    }
}
