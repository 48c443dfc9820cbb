use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{Sample, SampleStore, StoreResult};
use crate::clock::{Clock, SystemClock};

/// In-process store. Nothing survives a restart, so it backs tests and
/// throwaway runs (`store.backend = "memory"`).
///
/// Appends hold the write lock for the whole push, readers hold the read
/// lock while copying, so a reader never observes half a record.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    streams: RwLock<HashMap<String, Vec<Sample>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            streams: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn append(&self, stream: &str, value: f64) -> StoreResult<Sample> {
        let mut streams = self.streams.write();
        // Stamp under the lock so per-stream order matches timestamp order.
        let sample = Sample {
            stream: stream.to_owned(),
            timestamp: self.clock.now(),
            value,
        };

        let series = streams.entry(stream.to_owned()).or_default();
        // A clock stepping backwards must not break the sorted invariant.
        let at = series.partition_point(|s| s.timestamp <= sample.timestamp);
        series.insert(at, sample.clone());
        Ok(sample)
    }

    async fn select_range(
        &self,
        stream: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Sample>> {
        let streams = self.streams.read();
        let Some(series) = streams.get(stream) else {
            return Ok(Vec::new());
        };
        if start >= end {
            return Ok(Vec::new());
        }
        let lo = series.partition_point(|s| s.timestamp < start);
        let hi = series.partition_point(|s| s.timestamp < end);
        Ok(series[lo..hi].to_vec())
    }

    async fn latest(&self, stream: &str) -> StoreResult<Option<Sample>> {
        Ok(self
            .streams
            .read()
            .get(stream)
            .and_then(|series| series.last().cloned()))
    }

    async fn count_range(
        &self,
        stream: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let streams = self.streams.read();
        let Some(series) = streams.get(stream) else {
            return Ok(0);
        };
        if start >= end {
            return Ok(0);
        }
        let lo = series.partition_point(|s| s.timestamp < start);
        let hi = series.partition_point(|s| s.timestamp < end);
        Ok((hi - lo) as u64)
    }

    async fn streams(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self.streams.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
