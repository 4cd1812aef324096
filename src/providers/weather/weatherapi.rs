// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! WeatherAPI.com current-weather provider.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::advisory::{AdvisoryThresholds, Conditions};
use super::build_reading;
use crate::error::ProviderError;
use crate::providers::base::{http_client, Backend, ProviderSettings, WeatherProvider};
use crate::providers::credentials;
use crate::types::{Capability, WeatherReading};

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";
const DEFAULT_PRIORITY: u32 = 1;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const PROBE_QUERY: &str = "Delhi";

/// WeatherAPI error code for "No matching location found".
const NO_LOCATION_CODE: u32 = 1006;

/// `precip_mm` is the current reading, a short window like OpenWeatherMap's.
/// Humidity from this source runs slightly high, hence the higher bar.
const THRESHOLDS: AdvisoryThresholds = AdvisoryThresholds {
    disease_humidity: 85.0,
    dry_temperature: 30.0,
    heavy_rain_mm: 10.0,
    strong_wind_kmh: 35.0,
    cold_temperature: 10.0,
};

pub struct WeatherApiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    priority: u32,
    disabled: bool,
}

impl WeatherApiProvider {
    pub const NAME: &'static str = "weatherapi";

    pub fn new(api_key: Option<String>, settings: ProviderSettings) -> Self {
        Self {
            client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
            api_key,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            priority: settings.priority.unwrap_or(DEFAULT_PRIORITY),
            disabled: settings.disabled,
        }
    }

    async fn current(&self, query: &str) -> Result<CurrentResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("WEATHERAPI_KEY not set".to_string()))?;

        let response = self
            .client
            .get(format!("{}/current.json", self.base_url))
            .query(&[("key", api_key), ("q", query), ("aqi", "no")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &body, query));
        }

        response
            .json()
            .await
            .map_err(ProviderError::from)
    }

    fn handle_error_response(status_code: u16, body: &str, query: &str) -> ProviderError {
        match serde_json::from_str::<ApiError>(body) {
            Ok(error) if error.error.code == NO_LOCATION_CODE => {
                ProviderError::LocationNotFound(query.to_string())
            }
            Ok(error) => ProviderError::from_status(status_code, &error.error.message),
            Err(_) => ProviderError::from_status(status_code, body),
        }
    }

    fn to_reading(body: CurrentResponse) -> WeatherReading {
        let location = match body.location.region.as_deref() {
            Some(region) if !region.is_empty() => format!("{}, {}", body.location.name, region),
            _ => body.location.name.clone(),
        };
        let timestamp = body
            .current
            .last_updated_epoch
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now);

        let conditions = Conditions {
            temperature: body.current.temp_c,
            humidity: body.current.humidity,
            rainfall_mm: body.current.precip_mm,
            wind_kmh: body.current.wind_kph,
            condition: &body.current.condition.text,
        };
        build_reading(location, Self::NAME, &conditions, &THRESHOLDS, timestamp)
    }
}

impl Backend for WeatherApiProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capability(&self) -> Capability {
        Capability::Weather
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        !self.disabled && credentials::is_usable(self.api_key.as_deref())
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherReading, ProviderError> {
        let start = Instant::now();
        debug!(location = %location, "Fetching WeatherAPI conditions");

        let body = self.current(location).await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("weatherapi.fetch", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        body.map(Self::to_reading)
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        self.current(PROBE_QUERY).await.map(|_| ())
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    location: ApiLocation,
    current: ApiCurrent,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    name: String,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    last_updated_epoch: Option<i64>,
    temp_c: f64,
    humidity: f64,
    #[serde(default)]
    precip_mm: f64,
    #[serde(default)]
    wind_kph: f64,
    condition: ApiCondition,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: u32,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "location": {"name": "Ludhiana", "region": "Punjab", "country": "India"},
        "current": {
            "last_updated_epoch": 1700000000,
            "temp_c": 12.0,
            "humidity": 86,
            "precip_mm": 0.0,
            "wind_kph": 6.1,
            "condition": {"text": "Mist", "code": 1030}
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let body: CurrentResponse = serde_json::from_str(SAMPLE).unwrap();
        let reading = WeatherApiProvider::to_reading(body);

        assert_eq!(reading.location, "Ludhiana, Punjab");
        assert_eq!(reading.source, "weatherapi");
        assert_eq!(reading.humidity, 86.0);
        assert_eq!(reading.condition, "Mist");
        // 86% clears this provider's 85% bar
        assert!(reading.advisory_text.contains("fungal"));
        assert_eq!(reading.timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn test_location_not_found_code() {
        let body = r#"{"error":{"code":1006,"message":"No matching location found."}}"#;
        assert!(matches!(
            WeatherApiProvider::handle_error_response(400, body, "Atlantis"),
            ProviderError::LocationNotFound(q) if q == "Atlantis"
        ));

        let body = r#"{"error":{"code":2006,"message":"API key is invalid."}}"#;
        assert!(matches!(
            WeatherApiProvider::handle_error_response(401, body, "Delhi"),
            ProviderError::AuthError(_)
        ));
    }

    #[test]
    fn test_default_priority() {
        let p = WeatherApiProvider::new(Some("abcdef0123456789".into()), ProviderSettings::default());
        assert_eq!(p.priority(), 1);
        assert!(p.is_available());
        assert!(!WeatherApiProvider::new(None, ProviderSettings::default()).is_available());
    }

    #[tokio::test]
    async fn test_connection_error_keeps_key_out_of_message() {
        let key = "wa5ec7e7c0ffee5ec7e7";
        let p = WeatherApiProvider::new(
            Some(key.into()),
            ProviderSettings::default().with_base_url("http://127.0.0.1:1"),
        );
        let err = p.fetch_weather("Pune").await.unwrap_err();
        assert!(!err.to_string().contains(key), "{err}");
        assert!(!format!("{err:?}").contains(key), "{err:?}");
    }
}
