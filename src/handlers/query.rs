use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::query::{
    parse_optional_day, Aggregate, Average, Reading, Reduction, Status, Summary, WeeklySummary,
    Window, WindowParams,
};
use crate::store::Sample;
use crate::AppState;

use super::{timed, ApiError, TimedResponse};

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub stream: Option<String>,
    #[serde(flatten)]
    pub window: WindowParams,
}

fn required_stream(stream: &Option<String>) -> Result<&str, ApiError> {
    stream
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'stream' parameter".into()))
}

impl StreamQuery {
    fn stream(&self) -> Result<&str, ApiError> {
        required_stream(&self.stream)
    }

    fn window(&self, state: &AppState) -> Result<Window, ApiError> {
        Ok(self
            .window
            .resolve(state.engine.now(), state.engine.zone())?)
    }
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    pub stream: Option<String>,
    /// Last day of the week, `YYYY-MM-DD`; defaults to yesterday.
    pub end: Option<String>,
}

/// Wire shape of one reduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateBody {
    Count { count: u64 },
    Reading(Reading),
    Average(Average),
}

impl From<Aggregate> for AggregateBody {
    fn from(aggregate: Aggregate) -> Self {
        match aggregate {
            Aggregate::Min(r) | Aggregate::Max(r) => Self::Reading(r),
            Aggregate::Average(a) => Self::Average(a),
            Aggregate::Count(count) => Self::Count { count },
        }
    }
}

// ─── GET /api/min | /api/max | /api/avg | /api/count ─────────────

async fn reduce(
    state: Arc<AppState>,
    q: StreamQuery,
    reduction: Reduction,
    operation: &'static str,
) -> Result<Json<TimedResponse<AggregateBody>>, ApiError> {
    let t0 = Instant::now();

    timed(&state, operation, false, t0, async {
        let stream = q.stream()?;
        let window = q.window(&state)?;
        let aggregate = state.engine.reduce(stream, &window, reduction).await?;
        Ok::<_, ApiError>(aggregate.into())
    })
    .await
}

pub async fn get_min(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<AggregateBody>>, ApiError> {
    reduce(state, q, Reduction::Min, "min").await
}

pub async fn get_max(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<AggregateBody>>, ApiError> {
    reduce(state, q, Reduction::Max, "max").await
}

pub async fn get_average(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<AggregateBody>>, ApiError> {
    reduce(state, q, Reduction::Average, "avg").await
}

pub async fn get_count(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<AggregateBody>>, ApiError> {
    reduce(state, q, Reduction::Count, "count").await
}

// ─── GET /api/latest ─────────────────────────────────────────────

pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<Reading>>, ApiError> {
    let t0 = Instant::now();

    timed(&state, "latest", false, t0, async {
        Ok::<_, ApiError>(state.engine.latest(q.stream()?).await?)
    })
    .await
}

// ─── GET /api/data ───────────────────────────────────────────────

pub async fn get_range(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<Vec<Sample>>>, ApiError> {
    let t0 = Instant::now();

    timed(&state, "data", false, t0, async {
        let window = q.window(&state)?;
        Ok::<_, ApiError>(state.engine.range(q.stream()?, &window).await?)
    })
    .await
}

// ─── GET /api/summary ────────────────────────────────────────────

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<Summary>>, ApiError> {
    let t0 = Instant::now();

    timed(&state, "summary", false, t0, async {
        let window = q.window(&state)?;
        Ok::<_, ApiError>(state.engine.summary(q.stream()?, &window).await?)
    })
    .await
}

// ─── GET /api/status ─────────────────────────────────────────────

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<TimedResponse<Status>>, ApiError> {
    let t0 = Instant::now();

    timed(&state, "status", false, t0, async {
        let window = q.window(&state)?;
        Ok::<_, ApiError>(state.engine.status(&window).await?)
    })
    .await
}

// ─── GET /api/weekly ─────────────────────────────────────────────

pub async fn get_weekly(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WeeklyQuery>,
) -> Result<Json<TimedResponse<WeeklySummary>>, ApiError> {
    let t0 = Instant::now();

    timed(&state, "weekly", false, t0, async {
        let stream = required_stream(&q.stream)?;
        let end = parse_optional_day(q.end.as_deref())?;
        Ok::<_, ApiError>(state.engine.weekly(stream, end).await?)
    })
    .await
}
