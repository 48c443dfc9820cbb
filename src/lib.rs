//! Home sensor logging service.
//!
//! Collectors push scalar readings (`POST /api/streams/:stream?data=..`),
//! the service stamps and persists them, and clients ask for min / average /
//! max / count / latest over a trailing 24 hours or a calendar day.

use std::sync::Arc;

pub mod cli;
pub mod client;
pub mod clock;
pub mod collectors;
pub mod config;
pub mod handlers;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod query;
pub mod redis_client;
pub mod server;
pub mod store;

use clock::Clock;
use config::{Settings, StoreBackend};
use ingest::Ingestor;
use query::{DayZone, QueryEngine};
use store::{MemoryStore, RedisStore, SampleStore, StoreResult};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Backing store; also pinged by `/health`.
    pub store: Arc<dyn SampleStore>,

    /// Write path: validation in front of `store.append`.
    pub ingestor: Ingestor,

    /// Read path: every aggregate goes through here.
    pub engine: QueryEngine,

    /// Service self-metrics; handlers push observations, `/api/metrics` reads.
    pub metrics: Arc<metrics::MetricsCollector>,
}

impl AppState {
    pub fn new(store: Arc<dyn SampleStore>, clock: Arc<dyn Clock>, zone: DayZone) -> Self {
        Self {
            ingestor: Ingestor::new(store.clone()),
            engine: QueryEngine::new(store.clone(), clock, zone),
            store,
            metrics: Arc::new(metrics::MetricsCollector::new()),
        }
    }

    /// Opens the configured backend and wires everything to the wall clock.
    pub async fn from_settings(settings: &Settings) -> StoreResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(clock::SystemClock);
        let store: Arc<dyn SampleStore> = match settings.store.backend {
            StoreBackend::Redis => {
                let conn = redis_client::connect(&settings.store.redis_url).await?;
                Arc::new(RedisStore::with_clock(conn, clock.clone()))
            }
            StoreBackend::Memory => {
                tracing::warn!("using the in-memory store; samples are lost on exit");
                Arc::new(MemoryStore::with_clock(clock.clone()))
            }
        };
        Ok(Self::new(store, clock, settings.query.day_zone))
    }
}
