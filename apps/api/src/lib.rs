//! # Shopfront API
//!
//! HTTP JSON server for checkout and order administration.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         API Routes                                      │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌─────────────────────────┐  ┌──────────────┐ │
//! │  │  Public            │  │  Admin (JWT, role=admin)│  │  Ops         │ │
//! │  │                    │  │                         │  │              │ │
//! │  │ • POST /checkout   │  │ • GET /orders           │  │ • GET /health│ │
//! │  │                    │  │ • GET /orders/{id}      │  │              │ │
//! │  │                    │  │ • GET /orders/{id}/     │  │              │ │
//! │  │                    │  │       document          │  │              │ │
//! │  └─────────┬──────────┘  └────────────┬────────────┘  └──────────────┘ │
//! │            ▼                          ▼                                 │
//! │     CheckoutService              OrderStore                             │
//! │            └────────── PostgreSQL or MemoryStore ──────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `DATABASE_URL` - PostgreSQL connection string
//! - `SHOPFRONT_STORE` - `postgres` (default) or `memory`
//! - `HTTP_PORT` - HTTP port (default: 3000)
//! - `JWT_SECRET` - Secret for validating admin tokens
//! - `CHECKOUT_LOCK_TIMEOUT_MS` - Row lock wait bound (default: 5000)

pub mod auth;
pub mod config;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ErrorCode};
pub use router::app_router;
pub use state::AppState;
