//! Command-line front end: one handler per [`Command`] variant.

pub mod args;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{error, info};

use crate::client::HomeClient;
use crate::collectors::CollectorRegistry;
use crate::config::Settings;
use crate::query::{Average, Reading, Summary, WeeklySummary};
use crate::AppState;

pub use args::{Cli, Command, StreamDay};

pub async fn run(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        Command::Serve { bind } => serve(settings, bind).await,
        Command::Sample { stream } => sample(&settings, &stream).await,
        Command::Log { stream, value } => log(&settings, &stream, value).await,
        Command::Latest { stream } => {
            let reading = client(&settings)?.latest(&stream).await?;
            println!("{}", format_reading_at(&reading));
            Ok(())
        }
        Command::Min(a) => {
            let reading = client(&settings)?.min(&a.stream, a.day).await?;
            println!("{}", format_reading_at(&reading));
            Ok(())
        }
        Command::Max(a) => {
            let reading = client(&settings)?.max(&a.stream, a.day).await?;
            println!("{}", format_reading_at(&reading));
            Ok(())
        }
        Command::Avg(a) => {
            let avg = client(&settings)?.average(&a.stream, a.day).await?;
            println!("{}", format_average(&avg));
            Ok(())
        }
        Command::Count(a) => {
            let n = client(&settings)?.count(&a.stream, a.day).await?;
            println!("{n} entries {}", describe_window(a.day));
            Ok(())
        }
        Command::Summary(a) => {
            let summary = client(&settings)?.summary(&a.stream, a.day).await?;
            println!("{}", format_summary(&summary));
            Ok(())
        }
        Command::Data(a) => {
            for sample in client(&settings)?.data(&a.stream, a.day).await? {
                println!("{}  {}", local_time(sample.timestamp), sample.value);
            }
            Ok(())
        }
        Command::Status { day } => {
            let status = client(&settings)?.status(day).await?;
            println!("{} entries {}", status.count, describe_window(day));
            Ok(())
        }
        Command::Weekly { stream, end } => {
            let weekly = client(&settings)?.weekly(&stream, end).await?;
            print!("{}", format_weekly(&weekly));
            Ok(())
        }
    }
}

fn client(settings: &Settings) -> Result<HomeClient> {
    Ok(HomeClient::new(&settings.client)?)
}

// ─── serve ───────────────────────────────────────────────────────

async fn serve(settings: Settings, bind: Option<String>) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "homelog starting");
    let state = AppState::from_settings(&settings)
        .await
        .context("opening sample store")?;

    let addr = bind.unwrap_or_else(|| settings.server.bind_address());
    crate::server::serve(Arc::new(state), &addr)
        .await
        .with_context(|| format!("serving on {addr}"))?;

    info!("homelog stopped");
    Ok(())
}

// ─── sample / log ────────────────────────────────────────────────

async fn read_collector(settings: &Settings, stream: &str) -> Result<f64> {
    let registry = CollectorRegistry::from_config(&settings.collectors)
        .context("building collectors from config")?;
    let collector = registry.get(stream).ok_or_else(|| {
        let known: Vec<&str> = registry.streams().collect();
        anyhow!(
            "unknown stream '{stream}' (configured collectors: {})",
            if known.is_empty() { "none".to_owned() } else { known.join(", ") }
        )
    })?;

    collector
        .sample()
        .await
        .with_context(|| format!("reading {}", collector.describe()))
}

async fn sample(settings: &Settings, stream: &str) -> Result<()> {
    let value = read_collector(settings, stream).await?;
    println!("{value}");
    Ok(())
}

async fn log(settings: &Settings, stream: &str, value: Option<f64>) -> Result<()> {
    let value = match value {
        Some(v) => v,
        None => read_collector(settings, stream).await?,
    };

    match client(settings)?.log(stream, value).await {
        Ok(sample) => {
            info!(stream, value, timestamp = %sample.timestamp, "logged");
            Ok(())
        }
        Err(e) => {
            // No retry: the server may have stored it before the failure.
            error!(stream, value, error = %e, "POST failed");
            Err(e.into())
        }
    }
}

// ─── Formatting ──────────────────────────────────────────────────

const NO_DATA: &str = "no data";

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn describe_window(day: Option<NaiveDate>) -> String {
    match day {
        Some(d) => format!("on {d}"),
        None => "in last 24 hours".to_owned(),
    }
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_owned(), |v| format!("{v:.3}"))
}

pub fn format_reading_at(reading: &Reading) -> String {
    match reading {
        Reading::Value { value, timestamp } => format!("{value} at {}", local_time(*timestamp)),
        Reading::NoData => NO_DATA.to_owned(),
    }
}

pub fn format_average(avg: &Average) -> String {
    fmt_value(avg.value())
}

pub fn format_summary(s: &Summary) -> String {
    format!(
        "min = {}, avg = {}, max = {}, latest = {} ({} samples)",
        fmt_value(s.min.value()),
        fmt_value(s.average.value()),
        fmt_value(s.max.value()),
        fmt_value(s.latest.value()),
        s.count,
    )
}

pub fn format_weekly(w: &WeeklySummary) -> String {
    let mut out = String::new();
    for day in &w.days {
        out.push_str(&format!(
            "{}: {} {} {}\n",
            day.weekday,
            fmt_value(day.min.value()),
            fmt_value(day.average.value()),
            fmt_value(day.max.value()),
        ));
    }
    out.push_str(&format!(
        "Weekly: {} {} {}\n",
        fmt_value(w.week.min.value()),
        fmt_value(w.week.average.value()),
        fmt_value(w.week.max.value()),
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(min: Reading, average: Average) -> Summary {
        let at = Utc.with_ymd_and_hms(2021, 6, 14, 8, 0, 0).unwrap();
        Summary {
            stream: "pool".into(),
            start: at,
            end: at,
            count: 3,
            min,
            average,
            max: min,
            latest: min,
        }
    }

    #[test]
    fn summary_prints_three_decimals() {
        let at = Utc.with_ymd_and_hms(2021, 6, 14, 8, 0, 0).unwrap();
        let line = format_summary(&summary(
            Reading::Value { value: 77.9, timestamp: at },
            Average::Value { value: 78.5 },
        ));
        assert_eq!(
            line,
            "min = 77.900, avg = 78.500, max = 77.900, latest = 77.900 (3 samples)"
        );
    }

    #[test]
    fn no_data_is_spelled_out() {
        let line = format_summary(&summary(Reading::NoData, Average::NoData));
        assert!(line.starts_with("min = no data, avg = no data"));
        assert_eq!(format_average(&Average::NoData), "no data");
        assert_eq!(format_reading_at(&Reading::NoData), "no data");
    }

    #[test]
    fn zero_average_is_not_no_data() {
        assert_eq!(format_average(&Average::Value { value: 0.0 }), "0.000");
    }

    #[test]
    fn window_description() {
        assert_eq!(describe_window(None), "in last 24 hours");
        assert_eq!(
            describe_window(NaiveDate::from_ymd_opt(2021, 6, 10)),
            "on 2021-06-10"
        );
    }
}
