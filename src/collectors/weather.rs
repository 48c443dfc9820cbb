use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CollectError, Collector};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Outdoor temperature from a National Weather Service station, in °F.
pub struct WeatherStation {
    station: String,
    url: String,
    http: reqwest::Client,
}

// ─── Response shape (only what we read) ──────────────────────────

#[derive(Debug, Deserialize)]
struct Observation {
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    temperature: Measurement,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    value: Option<f64>,
}

impl WeatherStation {
    /// api.weather.gov turns away requests without a User-Agent, so a
    /// client that cannot carry one is an error rather than a fallback.
    pub fn new(station: &str, api_base: &str, user_agent: &str) -> Result<Self, CollectError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CollectError::Client {
                source_name: format!("weather station {station}"),
                message: e.to_string(),
            })?;
        Ok(Self {
            station: station.to_owned(),
            url: format!(
                "{}/stations/{station}/observations/latest",
                api_base.trim_end_matches('/')
            ),
            http,
        })
    }

    fn source_name(&self) -> String {
        format!("weather station {}", self.station)
    }
}

/// Pulls the Celsius reading out of an observation body and converts it.
pub fn fahrenheit_from_observation(body: &str, source_name: &str) -> Result<f64, CollectError> {
    let obs: Observation =
        serde_json::from_str(body).map_err(|e| CollectError::Malformed {
            source_name: source_name.to_owned(),
            message: e.to_string(),
        })?;

    obs.properties
        .temperature
        .value
        .map(|celsius| celsius * 1.8 + 32.0)
        .ok_or_else(|| CollectError::Missing {
            source_name: source_name.to_owned(),
        })
}

#[async_trait]
impl Collector for WeatherStation {
    fn describe(&self) -> String {
        self.source_name()
    }

    async fn sample(&self) -> Result<f64, CollectError> {
        let source_name = self.source_name();
        let network = |e: reqwest::Error| CollectError::Network {
            source_name: source_name.clone(),
            message: e.to_string(),
        };

        let response = self.http.get(&self.url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                source_name: source_name.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(network)?;
        fahrenheit_from_observation(&body, &source_name)
    }
}
