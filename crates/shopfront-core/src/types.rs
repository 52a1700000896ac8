//! # Domain Types
//!
//! Core domain types used throughout Shopfront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (BIGINT)    │   │  id (BIGINT)    │   │  order_id (FK)  │       │
//! │  │  name           │   │  order_number   │   │  product_id (FK)│       │
//! │  │  price_cents    │   │  buyer_*        │   │  quantity       │       │
//! │  │  stock_quantity │   │  total_cents    │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Checkout input:  CheckoutRequest { buyer: Buyer, items: [CheckoutLine]}│
//! │  Checkout output: PlacedOrder { orderId, orderNumber }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `OrderItem.unit_price_cents` is copied from the locked product row at
//! checkout time. Later price edits never reach committed orders.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Owned by the catalog; checkout only ever changes
/// `stock_quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub category_id: Option<i64>,

    /// Display name shown on orders and receipts.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set when the product is soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The part of a product row read while holding its exclusive lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedProduct {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

impl LockedProduct {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order. A checkout only ever creates paid orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Paid,
}

impl OrderStatus {
    /// The value stored in `orders.status`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(OrderStatus::Paid),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,

    /// `ORD-YYYYMMDD-<id>`. Only `None` inside the creating transaction.
    pub order_number: Option<String>,

    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,

    /// Σ(quantity × unit_price) over the order's items, fixed at creation.
    pub total_cents: i64,

    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// One line of a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,

    /// Current catalog name of the product (joined at read time).
    pub product_name: String,

    pub quantity: i64,

    /// Price captured under the row lock at checkout.
    pub unit_price_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// An order together with its items, as read back for display or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Values for the order row a checkout inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub total_cents: i64,
    pub status: OrderStatus,
    /// Creation timestamp; its date is the one encoded in the order number.
    pub placed_at: DateTime<Utc>,
}

/// Values for one order_items row a checkout inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

// =============================================================================
// Checkout Input / Output
// =============================================================================

/// Buyer contact details as submitted.
///
/// Every field defaults so a missing `buyer` object or `name` is reported as
/// a field error instead of a body parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One requested line: which product, how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl CheckoutLine {
    pub const fn new(product_id: i64, quantity: i64) -> Self {
        CheckoutLine {
            product_id,
            quantity,
        }
    }
}

/// The checkout request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub buyer: Buyer,
    #[serde(default)]
    pub items: Vec<CheckoutLine>,
}

/// A checkout request that passed validation. Buyer fields are trimmed and
/// blank optional fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub buyer: Buyer,
    pub lines: Vec<CheckoutLine>,
}

/// Result of a committed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: i64,
    pub order_number: String,
    pub total_cents: i64,
}
