//! # shopfront-core: Pure Business Logic for Shopfront
//!
//! Everything the checkout needs to decide, with zero I/O. The database
//! crate locks rows and hands the snapshot in here; this crate answers
//! "is the request well-formed, does the stock cover it, what does it cost,
//! what is the order called".
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopfront Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/api)                          │   │
//! │  │    POST /api/checkout, GET /api/orders, GET /api/orders/{id}    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             shopfront-db (CheckoutService, repositories)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ locked snapshot in, plan out          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ shopfront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────┐ │   │
//! │  │  │  types   │ │  money   │ │ checkout │ │validation│ │receipt│ │   │
//! │  │  │ Product  │ │  Money   │ │   plan   │ │  buyer   │ │ text  │ │   │
//! │  │  │  Order   │ │          │ │  totals  │ │  lines   │ │       │ │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └──────────┘ └───────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, OrderItem, checkout input)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Checkout request validation
//! - [`checkout`] - Stock check and totals over a locked snapshot
//! - [`order_number`] - `ORD-YYYYMMDD-<id>` display identifiers
//! - [`receipt`] - Plain-text purchase receipt
//!
//! ## Example Usage
//!
//! ```rust
//! use shopfront_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! assert_eq!(price.multiply_quantity(3).cents(), 3297);
//! ```

pub mod checkout;
pub mod error;
pub mod money;
pub mod order_number;
pub mod receipt;
pub mod types;
pub mod validation;

pub use checkout::{plan_checkout, CheckoutPlan, PlannedLine, StockDecrement};
pub use error::{CoreError, CoreResult, FieldError, ValidationError, ValidationErrors};
pub use money::Money;
pub use order_number::OrderNumber;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout request.
///
/// ## Business Reason
/// Caps transaction size and therefore how many product rows one checkout
/// can hold locked at once.
pub const MAX_CHECKOUT_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Minimum length of the buyer's name, after trimming.
pub const MIN_BUYER_NAME_LEN: usize = 2;

/// Minimum length of the buyer's phone number, after trimming.
pub const MIN_BUYER_PHONE_LEN: usize = 6;
