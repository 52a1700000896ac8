//! # Repository Module
//!
//! Pool-backed repositories for everything outside the checkout transaction.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Admin handler                                                         │
//! │       │                                                                 │
//! │       │  db.orders().list_orders(50)                                   │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── list_orders(&self, limit)                                         │
//! │  └── get_order(&self, id)                                              │
//! │       │                                                                 │
//! │       │  SQL Query (plain reads, no row locks)                         │
//! │       ▼                                                                 │
//! │  PostgreSQL                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes that must be atomic with a stock decrement go through
//! [`crate::store`] instead.
//!
//! ## Available Repositories
//!
//! - [`order::OrderRepository`] - Order listing and detail
//! - [`product::ProductRepository`] - Catalog reads and seeding

pub mod order;
pub mod product;
