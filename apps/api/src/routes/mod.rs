//! HTTP route handlers.
//!
//! - [`checkout`] - `POST /api/checkout` (public)
//! - [`orders`] - order listing, detail and receipt export (admin)
//! - [`health`] - `GET /api/health`

pub mod checkout;
pub mod health;
pub mod orders;
