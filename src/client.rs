//! HTTP client for the logging service, used by the CLI commands.
//!
//! Requests are never retried: a repeated ingest could store the same
//! reading twice and the store cannot deduplicate.

use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ClientSettings;
use crate::handlers::TimedResponse;
use crate::query::{Average, Reading, Status, Summary, WeeklySummary};
use crate::store::Sample;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid service URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },
    #[error("{url} answered {status}: {message}")]
    Server {
        url: String,
        status: u16,
        message: String,
    },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        source: reqwest::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct CountBody {
    count: u64,
}

#[derive(Clone)]
pub struct HomeClient {
    http: reqwest::Client,
    base_url: String,
}

impl HomeClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|source| ClientError::Transport {
                url: settings.base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
        })
    }

    // ─── Ingestion ───────────────────────────────────────────────

    pub async fn log(&self, stream: &str, value: f64) -> Result<Sample, ClientError> {
        let url = self.stream_url(stream)?;
        let request = self.http.post(url.clone()).query(&[("data", value.to_string())]);
        self.send(url.to_string(), request).await
    }

    // ─── Queries ─────────────────────────────────────────────────

    pub async fn latest(&self, stream: &str) -> Result<Reading, ClientError> {
        self.get("/api/latest", &[("stream", stream.to_owned())]).await
    }

    pub async fn min(&self, stream: &str, day: Option<NaiveDate>) -> Result<Reading, ClientError> {
        self.get("/api/min", &stream_params(stream, day)).await
    }

    pub async fn max(&self, stream: &str, day: Option<NaiveDate>) -> Result<Reading, ClientError> {
        self.get("/api/max", &stream_params(stream, day)).await
    }

    pub async fn average(
        &self,
        stream: &str,
        day: Option<NaiveDate>,
    ) -> Result<Average, ClientError> {
        self.get("/api/avg", &stream_params(stream, day)).await
    }

    pub async fn count(&self, stream: &str, day: Option<NaiveDate>) -> Result<u64, ClientError> {
        let body: CountBody = self.get("/api/count", &stream_params(stream, day)).await?;
        Ok(body.count)
    }

    pub async fn summary(
        &self,
        stream: &str,
        day: Option<NaiveDate>,
    ) -> Result<Summary, ClientError> {
        self.get("/api/summary", &stream_params(stream, day)).await
    }

    pub async fn status(&self, day: Option<NaiveDate>) -> Result<Status, ClientError> {
        let params: Vec<_> = day.map(|d| ("day", d.to_string())).into_iter().collect();
        self.get("/api/status", &params).await
    }

    pub async fn weekly(
        &self,
        stream: &str,
        end: Option<NaiveDate>,
    ) -> Result<WeeklySummary, ClientError> {
        let mut params = vec![("stream", stream.to_owned())];
        params.extend(end.map(|d| ("end", d.to_string())));
        self.get("/api/weekly", &params).await
    }

    pub async fn data(
        &self,
        stream: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<Sample>, ClientError> {
        self.get("/api/data", &stream_params(stream, day)).await
    }

    // ─── Plumbing ────────────────────────────────────────────────

    /// `{base}/api/streams/{stream}` with the stream name percent-encoded.
    fn stream_url(&self, stream: &str) -> Result<reqwest::Url, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["api", "streams", stream]);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let request = self.http.get(&url).query(params);
        self.send(url, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = match request.send().await {
            Ok(r) => r,
            Err(source) => return Err(ClientError::Transport { url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("error").to_owned(),
            };
            return Err(ClientError::Server {
                url,
                status: status.as_u16(),
                message,
            });
        }

        match response.json::<TimedResponse<T>>().await {
            Ok(body) => Ok(body.data),
            Err(source) => Err(ClientError::Decode { url, source }),
        }
    }
}

fn stream_params(stream: &str, day: Option<NaiveDate>) -> Vec<(&'static str, String)> {
    let mut params = vec![("stream", stream.to_owned())];
    params.extend(day.map(|d| ("day", d.to_string())));
    params
}
