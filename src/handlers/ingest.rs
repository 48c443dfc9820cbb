use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use crate::store::Sample;
use crate::AppState;

use super::{timed, ApiError, TimedResponse};

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    /// Raw value as sent by the collector; validated by the ingestor.
    pub data: Option<String>,
}

// ─── POST /api/streams/:stream?data=<value> ──────────────────────

pub async fn ingest_sample(
    State(state): State<Arc<AppState>>,
    Path(stream): Path<String>,
    Query(params): Query<IngestParams>,
) -> Result<Json<TimedResponse<Sample>>, ApiError> {
    let t0 = Instant::now();

    timed(&state, "ingest", true, t0, async {
        let raw = params
            .data
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("missing 'data' parameter".into()))?;
        Ok::<_, ApiError>(state.ingestor.ingest(&stream, raw).await?)
    })
    .await
}
