//! Admin order routes.
//!
//! All three sit behind [`crate::auth::require_admin`].
//!
//! ```text
//! GET /api/orders?limit=N          newest first, soft-deleted excluded
//! GET /api/orders/{id}             one order with its items
//! GET /api/orders/{id}/document    plain-text purchase receipt
//! ```

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Extension;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use shopfront_core::receipt::{receipt_file_name, render_receipt};
use shopfront_core::{Order, OrderDetail};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Page size when `limit` is not given.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// Requested page size, capped at `max`. Zero or negative is rejected.
fn page_size(requested: Option<i64>, max: i64) -> ApiResult<i64> {
    match requested {
        None => Ok(DEFAULT_LIST_LIMIT.min(max)),
        Some(n) if n < 1 => Err(ApiError::invalid_field(
            "limit",
            "limit must be a positive integer",
        )),
        Some(n) => Ok(n.min(max)),
    }
}

/// `GET /api/orders?limit=N`
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Order>>> {
    let Query(params) = params?;
    let limit = page_size(params.limit, state.config.order_list_limit)?;

    let orders = state.orders.list_orders(limit).await?;
    debug!(admin = %admin.subject, limit, returned = orders.len(), "Orders listed");

    Ok(Json(orders))
}

/// `GET /api/orders/{id}`
pub async fn get_order(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<OrderDetail>> {
    let Path(id) = id?;
    let detail = load_order(&state, id).await?;
    debug!(admin = %admin.subject, order_id = id, "Order viewed");
    Ok(Json(detail))
}

/// `GET /api/orders/{id}/document`
///
/// Served inline as `text/plain`, named after the order number.
pub async fn export_document(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let detail = load_order(&state, id).await?;

    let body = render_receipt(&detail);
    let disposition = format!(
        "inline; filename=\"{}\"",
        receipt_file_name(&detail.order)
    );

    info!(
        admin = %admin.subject,
        order_id = id,
        order_number = ?detail.order.order_number,
        "Receipt exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn load_order(state: &AppState, id: i64) -> ApiResult<OrderDetail> {
    state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))
}
