//! Liveness and database reachability.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `ok`, `unavailable`, or `memory` when no database is configured.
    pub database: &'static str,
}

/// `GET /api/health`
///
/// `503` when the configured database does not answer.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let Some(db) = &state.database else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "memory",
            }),
        );
    };

    if !db.health_check().await {
        warn!("Health check: database unavailable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                database: "unavailable",
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            database: "ok",
        }),
    )
}
