//! Public checkout route.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use shopfront_core::CheckoutRequest;

use crate::error::ApiResult;
use crate::state::AppState;

/// Body of a successful checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: i64,
    pub order_number: String,
}

/// `POST /api/checkout`
///
/// `201` with the new order's id and number. Every failure leaves stock and
/// orders exactly as they were.
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let Json(request) = payload?;

    let placed = state.checkout.checkout(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: placed.order_id,
            order_number: placed.order_number,
        }),
    ))
}
