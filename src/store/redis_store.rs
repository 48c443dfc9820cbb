//! Redis-backed sample store.
//!
//! Layout:
//!
//!   homelog:seq              INCR counter, one tick per append
//!   homelog:streams          SET of stream names
//!   homelog:stream:{name}    ZSET, score = unix seconds,
//!                            member = "{seq:020}:{value}"
//!
//! The zero-padded sequence makes every member unique and keeps insertion
//! order among samples that share a second. Durability across a crash
//! relies on the server running with `appendonly yes` and
//! `appendfsync always`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Sample, SampleStore, StoreError, StoreResult};
use crate::clock::{Clock, SystemClock};

const SEQ_KEY: &str = "homelog:seq";
const STREAMS_KEY: &str = "homelog:streams";
const STREAM_PREFIX: &str = "homelog:stream:";

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    clock: Arc<dyn Clock>,
    /// Serializes the INCR + MULTI/EXEC append path.
    write_lock: Arc<Mutex<()>>,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self::with_clock(conn, Arc::new(SystemClock))
    }

    pub fn with_clock(conn: ConnectionManager, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn,
            clock,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            StoreError::Connection(e.to_string())
        } else {
            StoreError::Command(e.to_string())
        }
    }
}

// ─── Key / member encoding ───────────────────────────────────────

fn stream_key(stream: &str) -> String {
    format!("{STREAM_PREFIX}{stream}")
}

fn encode_member(seq: u64, value: f64) -> String {
    // f64's Display is the shortest string that parses back to the same bits.
    format!("{seq:020}:{value}")
}

fn decode_member(key: &str, stream: &str, member: &str, score: f64) -> StoreResult<Sample> {
    let corrupt = || StoreError::Corrupt {
        key: key.to_owned(),
        member: member.to_owned(),
    };

    let (_, raw) = member.split_once(':').ok_or_else(corrupt)?;
    let value: f64 = raw.parse().map_err(|_| corrupt())?;
    let timestamp = DateTime::from_timestamp(score as i64, 0).ok_or_else(corrupt)?;

    Ok(Sample {
        stream: stream.to_owned(),
        timestamp,
        value,
    })
}

// ─── SampleStore impl ────────────────────────────────────────────

#[async_trait]
impl SampleStore for RedisStore {
    async fn append(&self, stream: &str, value: f64) -> StoreResult<Sample> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.conn.clone();

        let seq: u64 = conn.incr(SEQ_KEY, 1u64).await?;
        let timestamp = self.clock.now();
        let key = stream_key(stream);
        let member = encode_member(seq, value);

        // ZADD + SADD land together or not at all.
        let _: () = redis::pipe()
            .atomic()
            .zadd(&key, &member, timestamp.timestamp())
            .ignore()
            .sadd(STREAMS_KEY, stream)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!(%key, seq, value, "sample appended");
        Ok(Sample {
            stream: stream.to_owned(),
            timestamp,
            value,
        })
    }

    async fn select_range(
        &self,
        stream: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Sample>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let key = stream_key(stream);
        let mut conn = self.conn.clone();

        let rows: Vec<(String, f64)> = conn
            .zrangebyscore_withscores(&key, start.timestamp(), format!("({}", end.timestamp()))
            .await?;

        rows.iter()
            .map(|(member, score)| decode_member(&key, stream, member, *score))
            .collect()
    }

    async fn latest(&self, stream: &str) -> StoreResult<Option<Sample>> {
        let key = stream_key(stream);
        let mut conn = self.conn.clone();

        let rows: Vec<(String, f64)> = conn.zrange_withscores(&key, -1, -1).await?;
        rows.first()
            .map(|(member, score)| decode_member(&key, stream, member, *score))
            .transpose()
    }

    async fn count_range(
        &self,
        stream: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<u64> {
        if start >= end {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let n: u64 = conn
            .zcount(stream_key(stream), start.timestamp(), format!("({}", end.timestamp()))
            .await?;
        Ok(n)
    }

    async fn streams(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut names: Vec<String> = conn.smembers(STREAMS_KEY).await?;
        names.sort();
        Ok(names)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
