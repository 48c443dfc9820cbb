//! Self-metrics of the service: how long store round-trips take and how
//! many operations failed. Exposed at `GET /api/metrics`.

pub mod collector;

pub use collector::{LatencySummary, MetricsCollector, MetricsSnapshot};

/// A single timing observation recorded by a handler.
#[derive(Debug, Clone)]
pub struct Observation {
    /// e.g. "ingest", "min", "summary"
    pub operation: &'static str,
    /// Microseconds spent waiting on the store
    pub store_us: u64,
    /// Total handler wall time in microseconds
    pub total_us: u64,
    /// true = sample append, false = query
    pub is_write: bool,
    /// false when the request was rejected or the store failed
    pub success: bool,
}
