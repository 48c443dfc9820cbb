use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the default trailing window.
pub const TRAILING_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Error, PartialEq)]
pub enum WindowError {
    #[error("invalid day '{0}', expected YYYY-MM-DD")]
    InvalidDay(String),
    #[error("invalid time '{0}', expected RFC 3339 or YYYY-MM-DD HH:MM:SS")]
    InvalidTime(String),
    #[error("window start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("day {0} has no representable midnight")]
    Unrepresentable(NaiveDate),
}

/// Which calendar a "day" belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayZone {
    #[default]
    Local,
    Utc,
}

impl DayZone {
    /// Calendar day that contains `at`.
    pub fn day_of(self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            DayZone::Local => at.with_timezone(&Local).date_naive(),
            DayZone::Utc => at.date_naive(),
        }
    }

    /// First instant of `day`.
    pub fn start_of(self, day: NaiveDate) -> Result<DateTime<Utc>, WindowError> {
        // Zones whose DST jump skips midnight start the day at 01:00.
        [0, 1]
            .into_iter()
            .filter_map(|hour| day.and_hms_opt(hour, 0, 0))
            .find_map(|naive| self.wall_clock_to_utc(naive))
            .ok_or(WindowError::Unrepresentable(day))
    }

    /// `[midnight, next midnight)` of `day`.
    pub fn day_bounds(
        self,
        day: NaiveDate,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), WindowError> {
        let next = day.succ_opt().ok_or(WindowError::Unrepresentable(day))?;
        Ok((self.start_of(day)?, self.start_of(next)?))
    }

    fn wall_clock_to_utc(self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            DayZone::Utc => Some(Utc.from_utc_datetime(&naive)),
            DayZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Accepts RFC 3339, or a wall-clock `YYYY-MM-DD HH:MM:SS` in this zone.
    pub fn parse_time(self, raw: &str) -> Result<DateTime<Utc>, WindowError> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .and_then(|naive| self.wall_clock_to_utc(naive))
            .ok_or_else(|| WindowError::InvalidTime(raw.to_owned()))
    }
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, WindowError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| WindowError::InvalidDay(raw.to_owned()))
}

/// `None` and blank strings both mean "not given".
pub fn parse_optional_day(raw: Option<&str>) -> Result<Option<NaiveDate>, WindowError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_day)
        .transpose()
}

// ─── Window ──────────────────────────────────────────────────────

/// Time selection for an aggregate. Never stored, always resolved against
/// the current clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// `[now - 24h, now]`. The end is nudged one second forward so a
    /// sample written in the current second is included.
    #[default]
    Trailing24h,
    /// One calendar day in the configured zone.
    Day(NaiveDate),
    /// Explicit `[start, end)`.
    Between {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Window {
    pub fn bounds(
        &self,
        now: DateTime<Utc>,
        zone: DayZone,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), WindowError> {
        match *self {
            Window::Trailing24h => Ok((
                now - Duration::hours(TRAILING_WINDOW_HOURS),
                now + Duration::seconds(1),
            )),
            Window::Day(day) => zone.day_bounds(day),
            Window::Between { start, end } if start > end => {
                Err(WindowError::Inverted { start, end })
            }
            Window::Between { start, end } => Ok((start, end)),
        }
    }
}

/// Raw window parameters as they arrive on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowParams {
    pub day: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl WindowParams {
    /// `day` wins over `start`/`end`; a missing bound falls back to the
    /// trailing-24h bound.
    pub fn resolve(&self, now: DateTime<Utc>, zone: DayZone) -> Result<Window, WindowError> {
        if let Some(day) = non_blank(&self.day) {
            return Ok(Window::Day(parse_day(day)?));
        }

        match (non_blank(&self.start), non_blank(&self.end)) {
            (None, None) => Ok(Window::Trailing24h),
            (start, end) => {
                let (default_start, default_end) = Window::Trailing24h.bounds(now, zone)?;
                let start = start.map(|s| zone.parse_time(s)).transpose()?.unwrap_or(default_start);
                let end = end.map(|s| zone.parse_time(s)).transpose()?.unwrap_or(default_end);
                if start > end {
                    return Err(WindowError::Inverted { start, end });
                }
                Ok(Window::Between { start, end })
            }
        }
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
