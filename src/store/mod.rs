//! Append-only persistence of timestamped samples.
//!
//! Every backend implements [`SampleStore`]. Streams are created on first
//! append and there is no update or delete path.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

// ─── Domain type ─────────────────────────────────────────────────

/// One `(stream, timestamp, value)` record. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub stream: String,
    /// Assigned by the store at write time, whole seconds.
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unreachable: {0}")]
    Connection(String),
    #[error("storage command failed: {0}")]
    Command(String),
    #[error("undecodable record in {key}: {member}")]
    Corrupt { key: String, member: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ─── Store trait ─────────────────────────────────────────────────

#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Stamp `value` with the current time and persist it. The record is
    /// durable once this returns `Ok`.
    async fn append(&self, stream: &str, value: f64) -> StoreResult<Sample>;

    /// Samples with `start <= timestamp < end`, oldest first. Equal
    /// timestamps keep insertion order. Unknown streams yield an empty vec.
    async fn select_range(
        &self,
        stream: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Sample>>;

    /// Most recently appended sample, ignoring any window.
    async fn latest(&self, stream: &str) -> StoreResult<Option<Sample>>;

    async fn count_range(
        &self,
        stream: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<u64> {
        Ok(self.select_range(stream, start, end).await?.len() as u64)
    }

    /// Every stream holding at least one sample, sorted by name.
    async fn streams(&self) -> StoreResult<Vec<String>>;

    async fn ping(&self) -> StoreResult<()>;
}
