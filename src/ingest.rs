use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::store::{Sample, SampleStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Boundary between collectors and the store. Checks shape only: no unit
/// conversion, plausibility bounds or deduplication.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn SampleStore>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn SampleStore>) -> Self {
        Self { store }
    }

    pub async fn ingest(&self, stream: &str, raw_value: &str) -> Result<Sample, IngestError> {
        let (stream, value) = match validate(stream, raw_value) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(stream, raw_value, error = %e, "sample rejected");
                return Err(e);
            }
        };

        match self.store.append(stream, value).await {
            Ok(sample) => {
                debug!(stream, value, timestamp = %sample.timestamp, "sample stored");
                Ok(sample)
            }
            Err(e) => {
                error!(stream, value, error = %e, "sample write failed");
                Err(e.into())
            }
        }
    }
}

/// Stream name and parsed value, or the reason the pair is unusable.
/// Any non-empty stream name is accepted as is.
pub fn validate<'a>(stream: &'a str, raw_value: &str) -> Result<(&'a str, f64), IngestError> {
    if stream.is_empty() {
        return Err(IngestError::Validation("stream name must not be empty".into()));
    }

    let raw = raw_value.trim();
    let value: f64 = raw
        .parse()
        .map_err(|_| IngestError::Validation(format!("value '{raw}' is not a number")))?;
    if !value.is_finite() {
        return Err(IngestError::Validation(format!("value '{raw}' is not finite")));
    }

    Ok((stream, value))
}
