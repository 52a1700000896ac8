//! # shopfront-db: Database Layer for Shopfront
//!
//! PostgreSQL access through sqlx, and the checkout transaction that runs
//! on top of it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopfront Data Flow                              │
//! │                                                                         │
//! │  POST /api/checkout                    GET /api/orders                  │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shopfront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌─────────────────┐  │   │
//! │  │   │CheckoutService│   │ Repositories  │   │   Migrations    │  │   │
//! │  │   │ (checkout.rs) │   │ OrderRepo     │   │   (embedded)    │  │   │
//! │  │   └───────┬───────┘   │ ProductRepo   │   │ 001_initial.sql │  │   │
//! │  │           │           └───────┬───────┘   └─────────────────┘  │   │
//! │  │   ┌───────▼───────────────┐   │                                 │   │
//! │  │   │ store::CheckoutStore  │   │                                 │   │
//! │  │   │  PgCheckoutStore      │   │                                 │   │
//! │  │   │  MemoryStore          │   │                                 │   │
//! │  │   └───────┬───────────────┘   │                                 │   │
//! │  └───────────┼───────────────────┼─────────────────────────────────┘   │
//! │              ▼                   ▼                                      │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     PostgreSQL (PgPool)                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`store`] - Checkout unit of work (PostgreSQL and in-memory)
//! - [`checkout`] - The checkout coordinator
//! - [`repository`] - Order and product reads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopfront_db::{CheckoutService, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new(database_url)).await?;
//! let checkout = CheckoutService::new(db.checkout_store());
//!
//! let placed = checkout.checkout(&request).await?;
//! println!("{}", placed.order_number); // ORD-20250314-42
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutError, CheckoutService};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::order::OrderRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use store::memory::MemoryStore;
pub use store::postgres::PgCheckoutStore;
pub use store::{CheckoutStore, CheckoutTransaction, OrderStore};
