// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Open-Meteo provider (no API key).
//!
//! Place names are matched against a built-in table of agricultural stations
//! first. Anything the table does not know goes through the Open-Meteo
//! geocoding endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::advisory::{AdvisoryThresholds, Conditions};
use super::build_reading;
use crate::error::ProviderError;
use crate::providers::base::{http_client, Backend, ProviderSettings, WeatherProvider};
use crate::types::{Capability, WeatherReading};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1";
const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";
const DEFAULT_PRIORITY: u32 = 2;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m,weather_code";

/// Hourly precipitation, same window as OpenWeatherMap.
const THRESHOLDS: AdvisoryThresholds = AdvisoryThresholds {
    disease_humidity: 80.0,
    dry_temperature: 30.0,
    heavy_rain_mm: 7.5,
    strong_wind_kmh: 30.0,
    cold_temperature: 10.0,
};

/// Maximum edit distance accepted when fuzzy-matching a station name.
const MAX_FUZZY_DISTANCE: usize = 2;

/// A known agricultural station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub latitude: f64,
    pub longitude: f64,
}

pub const STATIONS: &[Station] = &[
    Station { name: "Delhi", aliases: &["new delhi"], latitude: 28.6139, longitude: 77.2090 },
    Station { name: "Mumbai", aliases: &["bombay"], latitude: 19.0760, longitude: 72.8777 },
    Station { name: "Bengaluru", aliases: &["bangalore"], latitude: 12.9716, longitude: 77.5946 },
    Station { name: "Chennai", aliases: &["madras"], latitude: 13.0827, longitude: 80.2707 },
    Station { name: "Kolkata", aliases: &["calcutta"], latitude: 22.5726, longitude: 88.3639 },
    Station { name: "Hyderabad", aliases: &[], latitude: 17.3850, longitude: 78.4867 },
    Station { name: "Pune", aliases: &["poona"], latitude: 18.5204, longitude: 73.8567 },
    Station { name: "Nagpur", aliases: &[], latitude: 21.1458, longitude: 79.0882 },
    Station { name: "Nashik", aliases: &["nasik"], latitude: 19.9975, longitude: 73.7898 },
    Station { name: "Ludhiana", aliases: &[], latitude: 30.9010, longitude: 75.8573 },
    Station { name: "Amritsar", aliases: &[], latitude: 31.6340, longitude: 74.8723 },
    Station { name: "Karnal", aliases: &[], latitude: 29.6857, longitude: 76.9905 },
    Station { name: "Jaipur", aliases: &[], latitude: 26.9124, longitude: 75.7873 },
    Station { name: "Jodhpur", aliases: &[], latitude: 26.2389, longitude: 73.0243 },
    Station { name: "Ahmedabad", aliases: &[], latitude: 23.0225, longitude: 72.5714 },
    Station { name: "Indore", aliases: &[], latitude: 22.7196, longitude: 75.8577 },
    Station { name: "Bhopal", aliases: &[], latitude: 23.2599, longitude: 77.4126 },
    Station { name: "Lucknow", aliases: &[], latitude: 26.8467, longitude: 80.9462 },
    Station { name: "Varanasi", aliases: &["banaras", "benares"], latitude: 25.3176, longitude: 82.9739 },
    Station { name: "Patna", aliases: &[], latitude: 25.5941, longitude: 85.1376 },
    Station { name: "Bhubaneswar", aliases: &[], latitude: 20.2961, longitude: 85.8245 },
    Station { name: "Guwahati", aliases: &["gauhati"], latitude: 26.1445, longitude: 91.7362 },
    Station { name: "Coimbatore", aliases: &[], latitude: 11.0168, longitude: 76.9558 },
    Station { name: "Madurai", aliases: &[], latitude: 9.9252, longitude: 78.1198 },
    Station { name: "Thiruvananthapuram", aliases: &["trivandrum"], latitude: 8.5241, longitude: 76.9366 },
    Station { name: "Mysuru", aliases: &["mysore"], latitude: 12.2958, longitude: 76.6394 },
    Station { name: "Guntur", aliases: &[], latitude: 16.3067, longitude: 80.4365 },
    Station { name: "Raipur", aliases: &[], latitude: 21.2514, longitude: 81.6296 },
];

/// Resolve a free-text place name against [`STATIONS`].
///
/// Only the part before the first comma is considered ("Pune, Maharashtra"
/// matches Pune). Exact name or alias wins; otherwise the closest name or
/// alias within [`MAX_FUZZY_DISTANCE`] edits.
pub fn match_station(location: &str) -> Option<&'static Station> {
    let query = location
        .split(',')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if query.is_empty() {
        return None;
    }

    if let Some(station) = STATIONS.iter().find(|s| station_names(s).any(|n| n == query)) {
        return Some(station);
    }

    STATIONS
        .iter()
        .filter_map(|s| {
            station_names(s)
                .map(|n| edit_distance(&n, &query))
                .min()
                .filter(|d| *d <= MAX_FUZZY_DISTANCE)
                .map(|d| (d, s))
        })
        .min_by_key(|(d, _)| *d)
        .map(|(_, s)| s)
}

fn station_names(station: &Station) -> impl Iterator<Item = String> + '_ {
    std::iter::once(station.name.to_lowercase())
        .chain(station.aliases.iter().map(|a| a.to_string()))
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// WMO weather interpretation code to a short label.
fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "fog",
        51 | 53 | 55 => "drizzle",
        56 | 57 => "freezing drizzle",
        61 => "light rain",
        63 => "moderate rain",
        65 => "heavy rain",
        66 | 67 => "freezing rain",
        71 | 73 | 75 | 77 => "snow",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorm",
        96 | 99 => "thunderstorm with hail",
        _ => "unknown",
    }
}

/// Coordinates resolved for a query.
#[derive(Debug, Clone, PartialEq)]
struct Place {
    label: String,
    latitude: f64,
    longitude: f64,
}

impl From<&Station> for Place {
    fn from(station: &Station) -> Self {
        Self {
            label: station.name.to_string(),
            latitude: station.latitude,
            longitude: station.longitude,
        }
    }
}

pub struct OpenMeteoProvider {
    client: Client,
    base_url: String,
    geocoding_url: String,
    priority: u32,
    disabled: bool,
}

impl OpenMeteoProvider {
    pub const NAME: &'static str = "open-meteo";

    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            geocoding_url: GEOCODING_URL.to_string(),
            priority: settings.priority.unwrap_or(DEFAULT_PRIORITY),
            disabled: settings.disabled,
        }
    }

    async fn resolve(&self, location: &str) -> Result<Place, ProviderError> {
        if let Some(station) = match_station(location) {
            debug!(station = station.name, "Matched built-in station");
            return Ok(station.into());
        }

        let query = location.trim();
        let response = self
            .client
            .get(format!("{}/search", self.geocoding_url))
            .query(&[("name", query), ("count", "1"), ("language", "en")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let body: GeocodingResponse = response
            .json()
            .await
            .map_err(ProviderError::from)?;
        Self::first_place(body, query)
    }

    fn first_place(body: GeocodingResponse, query: &str) -> Result<Place, ProviderError> {
        let result = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::LocationNotFound(query.to_string()))?;
        let label = match result.admin1 {
            Some(admin) if !admin.is_empty() => format!("{}, {}", result.name, admin),
            _ => result.name,
        };
        Ok(Place {
            label,
            latitude: result.latitude,
            longitude: result.longitude,
        })
    }

    async fn current(&self, place: &Place) -> Result<ForecastResponse, ProviderError> {
        let response = self
            .client
            .get(format!("{}/forecast", self.base_url))
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<MeteoError>(&body)
                .map(|e| e.reason)
                .unwrap_or(body);
            return Err(ProviderError::from_status(status.as_u16(), &message));
        }

        response
            .json()
            .await
            .map_err(ProviderError::from)
    }

    fn to_reading(body: ForecastResponse, place: Place) -> Result<WeatherReading, ProviderError> {
        let current = body
            .current
            .ok_or_else(|| ProviderError::ParseError("response has no 'current' block".to_string()))?;
        let timestamp = current
            .time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok())
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);
        let condition = current
            .weather_code
            .map(describe_weather_code)
            .unwrap_or("unknown");

        let conditions = Conditions {
            temperature: current.temperature_2m,
            humidity: current.relative_humidity_2m,
            rainfall_mm: current.precipitation,
            wind_kmh: current.wind_speed_10m,
            condition,
        };
        Ok(build_reading(place.label, Self::NAME, &conditions, &THRESHOLDS, timestamp))
    }
}

impl Backend for OpenMeteoProvider {
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
        !self.disabled
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherReading, ProviderError> {
        let start = Instant::now();
        debug!(location = %location, "Fetching Open-Meteo conditions");

        let result = async {
            let place = self.resolve(location).await?;
            let body = self.current(&place).await?;
            Self::to_reading(body, place)
        }
        .await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("open-meteo.fetch", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        result
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        let place = Place::from(&STATIONS[0]);
        self.current(&place).await.map(|_| ())
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<MeteoCurrent>,
}

#[derive(Debug, Deserialize)]
struct MeteoCurrent {
    time: Option<String>,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    #[serde(default)]
    precipitation: f64,
    #[serde(default)]
    wind_speed_10m: f64,
    weather_code: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    admin1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeteoError {
    reason: String,
}
