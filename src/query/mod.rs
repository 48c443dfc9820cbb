//! Range aggregates over the sample store.
//!
//! Min, max, average and count are projections of one fold
//! ([`RangeStats`]) over the selected samples, so every aggregate shares a
//! single scan and a single notion of "no data".

pub mod window;

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;
use crate::store::{Sample, SampleStore, StoreError};

pub use window::{parse_day, parse_optional_day, DayZone, Window, WindowError, WindowParams};

const WEEK_DAYS: u64 = 7;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Window(#[from] WindowError),
}

pub type QueryResult<T> = Result<T, QueryError>;

// ─── Result types ────────────────────────────────────────────────

/// A single sample picked out of a range, or explicit absence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reading {
    #[serde(rename = "ok")]
    Value {
        value: f64,
        timestamp: DateTime<Utc>,
    },
    NoData,
}

impl Reading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value { value, .. } => Some(*value),
            Reading::NoData => None,
        }
    }
}

impl From<Option<&Sample>> for Reading {
    fn from(sample: Option<&Sample>) -> Self {
        match sample {
            Some(s) => Reading::Value {
                value: s.value,
                timestamp: s.timestamp,
            },
            None => Reading::NoData,
        }
    }
}

/// Mean of a range. An empty range is `NoData`, never `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Average {
    #[serde(rename = "ok")]
    Value { value: f64 },
    NoData,
}

impl Average {
    pub fn value(&self) -> Option<f64> {
        match self {
            Average::Value { value } => Some(*value),
            Average::NoData => None,
        }
    }
}

// ─── The one reduction ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Min,
    Max,
    Average,
    Count,
}

/// Output of [`QueryEngine::reduce`], one variant per [`Reduction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    Min(Reading),
    Max(Reading),
    Average(Average),
    Count(u64),
}

/// Running state of a scan over samples in timestamp order.
#[derive(Debug, Clone, Default)]
pub struct RangeStats {
    count: u64,
    /// Running mean; a plain sum would overflow near `f64::MAX`.
    mean: f64,
    min: Option<Sample>,
    max: Option<Sample>,
}

impl RangeStats {
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Self {
        samples.into_iter().fold(Self::default(), |mut acc, s| {
            acc.push(s);
            acc
        })
    }

    /// Feed one sample. Samples must arrive oldest first: an extreme only
    /// moves on a strict improvement, so ties keep the earliest sample.
    pub fn push(&mut self, sample: &Sample) {
        self.count += 1;
        let n = self.count as f64;
        self.mean += sample.value / n - self.mean / n;
        keep_if_better(&mut self.min, sample, |candidate, best| candidate < best);
        keep_if_better(&mut self.max, sample, |candidate, best| candidate > best);
    }

    /// Fold a later range into this one.
    pub fn merge(&mut self, later: &RangeStats) {
        if later.count > 0 {
            let total = (self.count + later.count) as f64;
            self.mean = self.mean * (self.count as f64 / total)
                + later.mean * (later.count as f64 / total);
            self.count += later.count;
        }
        if let Some(s) = &later.min {
            keep_if_better(&mut self.min, s, |candidate, best| candidate < best);
        }
        if let Some(s) = &later.max {
            keep_if_better(&mut self.max, s, |candidate, best| candidate > best);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> Reading {
        self.min.as_ref().into()
    }

    pub fn max(&self) -> Reading {
        self.max.as_ref().into()
    }

    pub fn average(&self) -> Average {
        if self.count == 0 {
            Average::NoData
        } else {
            // Rounding may leave the mean a hair outside the extremes.
            let (lo, hi) = match (&self.min, &self.max) {
                (Some(lo), Some(hi)) => (lo.value, hi.value),
                _ => (f64::MIN, f64::MAX),
            };
            Average::Value {
                value: self.mean.clamp(lo, hi),
            }
        }
    }

    pub fn project(&self, reduction: Reduction) -> Aggregate {
        match reduction {
            Reduction::Min => Aggregate::Min(self.min()),
            Reduction::Max => Aggregate::Max(self.max()),
            Reduction::Average => Aggregate::Average(self.average()),
            Reduction::Count => Aggregate::Count(self.count),
        }
    }
}

fn keep_if_better(slot: &mut Option<Sample>, candidate: &Sample, better: fn(f64, f64) -> bool) {
    let replace = match slot {
        Some(best) => better(candidate.value, best.value),
        None => true,
    };
    if replace {
        *slot = Some(candidate.clone());
    }
}

// ─── Summaries ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub stream: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: u64,
    pub min: Reading,
    pub average: Average,
    pub max: Reading,
    pub latest: Reading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: NaiveDate,
    /// Short weekday name, e.g. "Mon".
    pub weekday: String,
    pub count: u64,
    pub min: Reading,
    pub average: Average,
    pub max: Reading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekTotals {
    pub count: u64,
    pub min: Reading,
    pub average: Average,
    pub max: Reading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub stream: String,
    pub days: Vec<DaySummary>,
    pub week: WeekTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub count: u64,
    pub streams: Vec<String>,
}

// ─── Engine ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn SampleStore>,
    clock: Arc<dyn Clock>,
    zone: DayZone,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn SampleStore>, clock: Arc<dyn Clock>, zone: DayZone) -> Self {
        Self { store, clock, zone }
    }

    pub fn zone(&self) -> DayZone {
        self.zone
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn bounds(&self, window: &Window) -> QueryResult<(DateTime<Utc>, DateTime<Utc>)> {
        Ok(window.bounds(self.clock.now(), self.zone)?)
    }

    /// Samples of `stream` inside `window`, oldest first.
    pub async fn range(&self, stream: &str, window: &Window) -> QueryResult<Vec<Sample>> {
        let (start, end) = self.bounds(window)?;
        Ok(self.store.select_range(stream, start, end).await?)
    }

    pub async fn stats(&self, stream: &str, window: &Window) -> QueryResult<RangeStats> {
        let samples = self.range(stream, window).await?;
        Ok(RangeStats::from_samples(&samples))
    }

    /// Min, max, average or count of one range. Counting skips the fold
    /// since the store can count without shipping samples.
    pub async fn reduce(
        &self,
        stream: &str,
        window: &Window,
        reduction: Reduction,
    ) -> QueryResult<Aggregate> {
        if reduction == Reduction::Count {
            return Ok(Aggregate::Count(self.count(stream, window).await?));
        }
        let aggregate = self.stats(stream, window).await?.project(reduction);
        debug!(stream, ?window, ?reduction, ?aggregate, "range reduced");
        Ok(aggregate)
    }

    pub async fn min(&self, stream: &str, window: &Window) -> QueryResult<Reading> {
        Ok(self.stats(stream, window).await?.min())
    }

    pub async fn max(&self, stream: &str, window: &Window) -> QueryResult<Reading> {
        Ok(self.stats(stream, window).await?.max())
    }

    pub async fn average(&self, stream: &str, window: &Window) -> QueryResult<Average> {
        Ok(self.stats(stream, window).await?.average())
    }

    pub async fn count(&self, stream: &str, window: &Window) -> QueryResult<u64> {
        let (start, end) = self.bounds(window)?;
        Ok(self.store.count_range(stream, start, end).await?)
    }

    /// Globally most recent sample; no window applies.
    pub async fn latest(&self, stream: &str) -> QueryResult<Reading> {
        Ok(self.store.latest(stream).await?.as_ref().into())
    }

    pub async fn summary(&self, stream: &str, window: &Window) -> QueryResult<Summary> {
        let (start, end) = self.bounds(window)?;
        let samples = self.store.select_range(stream, start, end).await?;
        let stats = RangeStats::from_samples(&samples);
        let latest = self.latest(stream).await?;

        Ok(Summary {
            stream: stream.to_owned(),
            start,
            end,
            count: stats.count(),
            min: stats.min(),
            average: stats.average(),
            max: stats.max(),
            latest,
        })
    }

    /// Sample count over every stream.
    pub async fn status(&self, window: &Window) -> QueryResult<Status> {
        let (start, end) = self.bounds(window)?;
        let streams = self.store.streams().await?;

        let mut count = 0;
        for stream in &streams {
            count += self.store.count_range(stream, start, end).await?;
        }
        Ok(Status { count, streams })
    }

    /// Per-day figures for the seven days ending with `last_day`
    /// (default: yesterday), plus totals for the whole week.
    pub async fn weekly(
        &self,
        stream: &str,
        last_day: Option<NaiveDate>,
    ) -> QueryResult<WeeklySummary> {
        let last_day = match last_day {
            Some(day) => day,
            None => self.zone.day_of(self.clock.now() - Duration::days(1)),
        };
        let first_day = last_day
            .checked_sub_days(Days::new(WEEK_DAYS - 1))
            .ok_or(WindowError::Unrepresentable(last_day))?;

        let (week_start, _) = self.zone.day_bounds(first_day)?;
        let (_, week_end) = self.zone.day_bounds(last_day)?;
        let samples = self.store.select_range(stream, week_start, week_end).await?;

        let mut days = Vec::with_capacity(WEEK_DAYS as usize);
        let mut week = RangeStats::default();
        let mut rest = samples.as_slice();

        for day in first_day.iter_days().take(WEEK_DAYS as usize) {
            let (_, day_end) = self.zone.day_bounds(day)?;
            let split = rest.partition_point(|s| s.timestamp < day_end);
            let (today, later) = rest.split_at(split);
            rest = later;

            let stats = RangeStats::from_samples(today);
            // Seeded from the first day with data, so negative or
            // all-positive streams get a true weekly min.
            week.merge(&stats);

            days.push(DaySummary {
                day,
                weekday: day.weekday().to_string(),
                count: stats.count(),
                min: stats.min(),
                average: stats.average(),
                max: stats.max(),
            });
        }

        Ok(WeeklySummary {
            stream: stream.to_owned(),
            days,
            week: WeekTotals {
                count: week.count(),
                min: week.min(),
                average: week.average(),
                max: week.max(),
            },
        })
    }
}
