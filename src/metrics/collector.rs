use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::Observation;

// ─── Configuration ───────────────────────────────────────────────

/// How many individual operations we keep for `/api/metrics`
const MAX_RECENT: usize = 50;

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe metrics engine. Handlers call `record()`, the metrics
/// endpoint calls `snapshot()`.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

/// Latency percentiles for one class of operation. `None` fields mean the
/// class has not been observed yet.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_us: Option<u64>,
    pub p50_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
    pub mean_us: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentOperation {
    pub at: DateTime<Utc>,
    pub operation: &'static str,
    pub store_us: u64,
    pub total_us: u64,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub writes: LatencySummary,
    pub reads: LatencySummary,
    pub end_to_end: LatencySummary,
    pub total_operations: u64,
    pub total_errors: u64,
    /// Operation name → number of calls
    pub per_operation: BTreeMap<&'static str, u64>,
    pub recent: Vec<RecentOperation>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    write_hist: Histogram<u64>,
    read_hist: Histogram<u64>,
    e2e_hist: Histogram<u64>,
    total_operations: u64,
    total_errors: u64,
    per_operation: BTreeMap<&'static str, u64>,
    recent: VecDeque<RecentOperation>,
    started: Instant,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn record(&self, obs: Observation) {
        self.inner.lock().record(obs);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

fn histogram() -> Histogram<u64> {
    // Bounds are compile-time constants that satisfy hdrhistogram's checks.
    Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
        .expect("static histogram bounds")
}

impl Inner {
    fn new() -> Self {
        Self {
            write_hist: histogram(),
            read_hist: histogram(),
            e2e_hist: histogram(),
            total_operations: 0,
            total_errors: 0,
            per_operation: BTreeMap::new(),
            recent: VecDeque::with_capacity(MAX_RECENT + 1),
            started: Instant::now(),
        }
    }

    fn record(&mut self, obs: Observation) {
        self.total_operations += 1;
        if !obs.success {
            self.total_errors += 1;
        }
        *self.per_operation.entry(obs.operation).or_default() += 1;

        // Clamp to the histogram floor; saturate at its ceiling.
        let store_us = obs.store_us.clamp(HIST_LOW, HIST_HIGH);
        let total_us = obs.total_us.clamp(HIST_LOW, HIST_HIGH);
        let hist = if obs.is_write {
            &mut self.write_hist
        } else {
            &mut self.read_hist
        };
        let _ = hist.record(store_us);
        let _ = self.e2e_hist.record(total_us);

        self.recent.push_back(RecentOperation {
            at: Utc::now(),
            operation: obs.operation,
            store_us: obs.store_us,
            total_us: obs.total_us,
            success: obs.success,
        });
        if self.recent.len() > MAX_RECENT {
            self.recent.pop_front();
        }
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started.elapsed().as_secs_f64(),
            writes: summarize(&self.write_hist),
            reads: summarize(&self.read_hist),
            end_to_end: summarize(&self.e2e_hist),
            total_operations: self.total_operations,
            total_errors: self.total_errors,
            per_operation: self.per_operation.clone(),
            recent: self.recent.iter().cloned().collect(),
        }
    }
}

fn summarize(hist: &Histogram<u64>) -> LatencySummary {
    if hist.len() == 0 {
        return LatencySummary::default();
    }
    LatencySummary {
        count: hist.len(),
        min_us: Some(hist.min()),
        p50_us: Some(hist.value_at_quantile(0.5)),
        p99_us: Some(hist.value_at_quantile(0.99)),
        max_us: Some(hist.max()),
        mean_us: Some(hist.mean()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(operation: &'static str, is_write: bool, success: bool) -> Observation {
        Observation {
            operation,
            store_us: 120,
            total_us: 150,
            is_write,
            success,
        }
    }

    #[test]
    fn empty_collector_reports_no_latencies() {
        let snap = MetricsCollector::new().snapshot();
        assert_eq!(snap.total_operations, 0);
        assert_eq!(snap.reads.count, 0);
        assert!(snap.reads.p50_us.is_none());
    }

    #[test]
    fn reads_and_writes_land_in_separate_histograms() {
        let metrics = MetricsCollector::new();
        metrics.record(obs("ingest", true, true));
        metrics.record(obs("min", false, true));
        metrics.record(obs("min", false, false));

        let snap = metrics.snapshot();
        assert_eq!(snap.writes.count, 1);
        assert_eq!(snap.reads.count, 2);
        assert_eq!(snap.end_to_end.count, 3);
        assert_eq!(snap.total_errors, 1);
        assert_eq!(snap.per_operation["min"], 2);
        assert_eq!(snap.recent.len(), 3);
    }

    #[test]
    fn recent_feed_is_bounded() {
        let metrics = MetricsCollector::new();
        for _ in 0..(MAX_RECENT + 10) {
            metrics.record(obs("latest", false, true));
        }
        assert_eq!(metrics.snapshot().recent.len(), MAX_RECENT);
    }
}
