//! Adapters that read one current value from an external source.
//!
//! Each adapter is built from its own [`CollectorConfig`] entry; there is no
//! process-wide credential state. Failures are returned to the caller, which
//! logs them and moves on to the next scheduled reading.

pub mod weather;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::CollectorConfig;

pub use weather::WeatherStation;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("request to {source_name} failed: {message}")]
    Network { source_name: String, message: String },
    #[error("{source_name} answered with status {status}")]
    Status { source_name: String, status: u16 },
    #[error("malformed response from {source_name}: {message}")]
    Malformed { source_name: String, message: String },
    #[error("{source_name} has no current reading")]
    Missing { source_name: String },
    #[error("cannot set up HTTP client for {source_name}: {message}")]
    Client { source_name: String, message: String },
}

#[async_trait]
pub trait Collector: Send + Sync {
    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> String;

    /// One current reading. No retries within a single call.
    async fn sample(&self) -> Result<f64, CollectError>;
}

/// Constant reading, for smoke tests of a deployment.
pub struct FixedValue(pub f64);

#[async_trait]
impl Collector for FixedValue {
    fn describe(&self) -> String {
        format!("fixed value {}", self.0)
    }

    async fn sample(&self) -> Result<f64, CollectError> {
        Ok(self.0)
    }
}

/// Stream name → collector, built once at startup from the settings.
pub struct CollectorRegistry {
    collectors: BTreeMap<String, Box<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn from_config(config: &BTreeMap<String, CollectorConfig>) -> Result<Self, CollectError> {
        let collectors = config
            .iter()
            .map(|(stream, cfg)| Ok((stream.clone(), build(cfg)?)))
            .collect::<Result<_, CollectError>>()?;
        Ok(Self { collectors })
    }

    pub fn get(&self, stream: &str) -> Option<&dyn Collector> {
        self.collectors.get(stream).map(|c| c.as_ref())
    }

    pub fn streams(&self) -> impl Iterator<Item = &str> {
        self.collectors.keys().map(String::as_str)
    }
}

fn build(config: &CollectorConfig) -> Result<Box<dyn Collector>, CollectError> {
    Ok(match config {
        CollectorConfig::WeatherStation {
            station,
            api_base,
            user_agent,
        } => Box::new(WeatherStation::new(station, api_base, user_agent)?),
        CollectorConfig::Fixed { value } => Box::new(FixedValue(*value)),
    })
}
