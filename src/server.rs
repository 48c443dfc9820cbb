use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::{self, ApiError};
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Ingestion ───────────────────────────────────────────
        .route(
            "/api/streams/:stream",
            post(handlers::ingest::ingest_sample),
        )
        // ── Aggregates ──────────────────────────────────────────
        .route("/api/latest", get(handlers::query::get_latest))
        .route("/api/min", get(handlers::query::get_min))
        .route("/api/max", get(handlers::query::get_max))
        .route("/api/avg", get(handlers::query::get_average))
        .route("/api/count", get(handlers::query::get_count))
        .route("/api/summary", get(handlers::query::get_summary))
        .route("/api/weekly", get(handlers::query::get_weekly))
        // ── Raw range + whole-store status ──────────────────────
        .route("/api/data", get(handlers::query::get_range))
        .route("/api/status", get(handlers::query::get_status))
        // ── Service ─────────────────────────────────────────────
        .route("/api/metrics", get(handlers::health::get_metrics))
        .route("/health", get(handlers::health::health))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        .fallback(|| async { ApiError::NotFound("no such endpoint".into()) })
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}

/// Binds `addr` and serves until the process receives Ctrl-C.
pub async fn serve(state: Arc<AppState>, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
}
