use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_USER_AGENT: &str = "weather-app/1.0";

const GEO_JSON: &str = "application/geo+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error! status: {status} ({url})")]
    Status { status: u16, url: String },
    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
}

pub trait WeatherSource: Send + Sync {
    fn base_url(&self) -> &str;
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;
}

pub struct NwsClient {
    client: Client,
    base_url: String,
}

impl NwsClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent(user_agent)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for NwsClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_USER_AGENT)
    }
}

impl WeatherSource for NwsClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!(url, "nws request");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, GEO_JSON)
            .send()
            .map_err(|e| {
                error!(url, error = %e, "nws request failed");
                FetchError::Request(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(url, status = status.as_u16(), "nws request returned error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.json().map_err(|e| {
            error!(url, error = %e, "nws response was not json");
            FetchError::Request(e)
        })
    }
}

pub fn fetch<T: DeserializeOwned>(source: &dyn WeatherSource, url: &str) -> Result<T, FetchError> {
    let value = source.fetch_json(url)?;
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsResponse {
    #[serde(default)]
    pub features: Vec<AlertFeature>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertFeature {
    #[serde(default)]
    pub properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProperties {
    pub event: Option<String>,
    pub area_desc: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub headline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PointsResponse {
    pub properties: Option<PointsProperties>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PointsProperties {
    pub forecast: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastResponse {
    pub properties: Option<ForecastProperties>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastProperties {
    #[serde(default)]
    pub periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub name: Option<String>,
    pub temperature: Option<serde_json::Number>,
    pub temperature_unit: Option<String>,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    pub short_forecast: Option<String>,
}
