pub mod health;
pub mod ingest;
pub mod query;

use std::future::Future;
use std::time::Instant;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::ingest::IngestError;
use crate::metrics::Observation;
use crate::query::{QueryError, WindowError};
use crate::store::StoreError;
use crate::AppState;

// ─── Shared response envelope ────────────────────────────────────

/// Every API response is wrapped with timing metadata so a client can see
/// where a slow answer came from without parsing headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedResponse<T> {
    pub data: T,
    pub timing: RequestTiming,
}

/// Microsecond breakdown of where wall-clock time was spent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestTiming {
    /// Total handler wall time (μs)
    pub total_us: u64,
    /// Time spent in the store call and the reduction over its rows (μs)
    pub store_us: u64,
    /// Parameter parsing / validation / serialization overhead (μs)
    pub overhead_us: u64,
}

/// Runs one store-backed operation, records it in the service metrics and
/// wraps the result in the timing envelope.
pub(crate) async fn timed<T, F>(
    state: &AppState,
    operation: &'static str,
    is_write: bool,
    t0: Instant,
    work: F,
) -> Result<Json<TimedResponse<T>>, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let t_store = Instant::now();
    let result = work.await;
    let store_us = t_store.elapsed().as_micros() as u64;

    let total_us = t0.elapsed().as_micros() as u64;
    state.metrics.record(Observation {
        operation,
        store_us,
        total_us,
        is_write,
        success: result.is_ok(),
    });

    Ok(Json(TimedResponse {
        data: result?,
        timing: RequestTiming {
            total_us,
            store_us,
            overhead_us: total_us.saturating_sub(store_us),
        },
    }))
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, format!("Store: {msg}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Connection(_) | StoreError::Command(_) => Self::Unavailable(e.to_string()),
            StoreError::Corrupt { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl From<WindowError> for ApiError {
    fn from(e: WindowError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Store(e) => e.into(),
            QueryError::Window(e) => e.into(),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Validation(msg) => Self::BadRequest(msg),
            IngestError::Store(e) => e.into(),
        }
    }
}
