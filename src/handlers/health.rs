use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::MetricsSnapshot;
use crate::AppState;

use super::ApiError;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

// ─── GET /health ─────────────────────────────────────────────────

/// Ok only when the store answers a ping.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Health>, ApiError> {
    state.store.ping().await?;
    Ok(Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

// ─── GET /api/metrics ────────────────────────────────────────────

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
