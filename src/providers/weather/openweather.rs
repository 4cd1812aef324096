// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenWeatherMap current-weather provider.

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

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_PRIORITY: u32 = 0;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// City used by the liveness probe.
const PROBE_CITY: &str = "Delhi";

/// Rain is reported over the last hour, so "heavy" is lower than for daily totals.
const THRESHOLDS: AdvisoryThresholds = AdvisoryThresholds {
    disease_humidity: 80.0,
    dry_temperature: 30.0,
    heavy_rain_mm: 10.0,
    strong_wind_kmh: 30.0,
    cold_temperature: 10.0,
};

pub struct OpenWeatherProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    priority: u32,
    disabled: bool,
}

impl OpenWeatherProvider {
    pub const NAME: &'static str = "openweathermap";

    pub fn new(api_key: Option<String>, settings: ProviderSettings) -> Self {
        Self {
            client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
            api_key,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            priority: settings.priority.unwrap_or(DEFAULT_PRIORITY),
            disabled: settings.disabled,
        }
    }

    async fn current(&self, location: &str) -> Result<OwmResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OPENWEATHER_API_KEY not set".to_string()))?;

        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ProviderError::LocationNotFound(location.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OwmError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ProviderError::from_status(status.as_u16(), &message));
        }

        response
            .json()
            .await
            .map_err(ProviderError::from)
    }

    fn to_reading(body: OwmResponse, requested: &str) -> Result<WeatherReading, ProviderError> {
        let main = body
            .main
            .ok_or_else(|| ProviderError::ParseError("response has no 'main' block".to_string()))?;
        let condition = body
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .unwrap_or_else(|| "unknown".to_string());
        let rainfall_mm = body.rain.and_then(|r| r.one_hour).unwrap_or(0.0);
        // m/s to km/h
        let wind_kmh = body.wind.map(|w| w.speed * 3.6).unwrap_or(0.0);
        let location = body
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| requested.trim().to_string());
        let timestamp = body
            .dt
            .and_then(|dt| DateTime::<Utc>::from_timestamp(dt, 0))
            .unwrap_or_else(Utc::now);

        let conditions = Conditions {
            temperature: main.temp,
            humidity: main.humidity,
            rainfall_mm,
            wind_kmh,
            condition: &condition,
        };
        Ok(build_reading(location, Self::NAME, &conditions, &THRESHOLDS, timestamp))
    }
}

impl Backend for OpenWeatherProvider {
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
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherReading, ProviderError> {
        let start = Instant::now();
        debug!(location = %location, "Fetching OpenWeatherMap conditions");

        let body = self.current(location).await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("openweathermap.fetch", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Self::to_reading(body?, location)
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        self.current(PROBE_CITY).await.map(|_| ())
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: Option<String>,
    dt: Option<i64>,
    main: Option<OwmMain>,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    wind: Option<OwmWind>,
    rain: Option<OwmRain>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "weather": [{"id": 501, "main": "Rain", "description": "moderate rain"}],
        "main": {"temp": 27.4, "feels_like": 30.1, "humidity": 88, "pressure": 1004},
        "wind": {"speed": 5.0, "deg": 240},
        "rain": {"1h": 2.5},
        "dt": 1719907200,
        "name": "Pune"
    }"#;

    #[test]
    fn test_parse_sample() {
        let body: OwmResponse = serde_json::from_str(SAMPLE).unwrap();
        let reading = OpenWeatherProvider::to_reading(body, "  pune ").unwrap();

        assert_eq!(reading.location, "Pune");
        assert_eq!(reading.source, "openweathermap");
        assert_eq!(reading.temperature, 27.4);
        assert_eq!(reading.humidity, 88.0);
        assert_eq!(reading.rainfall_mm, 2.5);
        assert!((reading.wind_kmh - 18.0).abs() < 1e-9);
        assert_eq!(reading.condition, "moderate rain");
        assert!(reading.advisory_text.contains("fungal"));
        assert_eq!(reading.timestamp.timestamp(), 1719907200);
    }

    #[test]
    fn test_missing_rain_means_zero() {
        let body: OwmResponse = serde_json::from_str(
            r#"{"weather":[{"description":"clear sky"}],"main":{"temp":34.0,"humidity":30},"wind":{"speed":1.0}}"#,
        )
        .unwrap();
        let reading = OpenWeatherProvider::to_reading(body, "Jodhpur").unwrap();
        assert_eq!(reading.rainfall_mm, 0.0);
        assert_eq!(reading.location, "Jodhpur");
        assert!(reading.advisory_text.contains("Dry"));
    }

    #[test]
    fn test_missing_main_is_parse_error() {
        let body: OwmResponse = serde_json::from_str(r#"{"name":"Nowhere"}"#).unwrap();
        assert!(matches!(
            OpenWeatherProvider::to_reading(body, "Nowhere"),
            Err(ProviderError::ParseError(_))
        ));
    }

    #[test]
    fn test_availability() {
        let p = OpenWeatherProvider::new(Some("0123456789abcdef0123456789abcdef".into()), ProviderSettings::default());
        assert!(p.is_available());
        assert_eq!(p.priority(), 0);
        assert!(!OpenWeatherProvider::new(Some("your_api_key_here".into()), ProviderSettings::default()).is_available());
    }

    #[tokio::test]
    async fn test_connection_error_keeps_key_out_of_message() {
        let key = "5ec7e7c0ffee5ec7e7c0ffee5ec7e7c0";
        let p = OpenWeatherProvider::new(
            Some(key.into()),
            ProviderSettings::default().with_base_url("http://127.0.0.1:1"),
        );
        let err = p.fetch_weather("Pune").await.unwrap_err();
        assert!(matches!(err, ProviderError::NetworkError(_) | ProviderError::RequestTimeout));
        assert!(!err.to_string().contains(key), "{err}");
        assert!(!err.to_string().contains("appid"), "{err}");
    }
}
