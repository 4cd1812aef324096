// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Current-weather backends, in default failover order:
//!
//! - [`openweather::OpenWeatherProvider`] (`OPENWEATHER_API_KEY`)
//! - [`weatherapi::WeatherApiProvider`] (`WEATHERAPI_KEY`)
//! - [`open_meteo::OpenMeteoProvider`] (no key)

pub mod advisory;
pub mod open_meteo;
pub mod openweather;
pub mod weatherapi;

pub use advisory::AdvisoryThresholds;
pub use open_meteo::{match_station, OpenMeteoProvider, Station};
pub use openweather::OpenWeatherProvider;
pub use weatherapi::WeatherApiProvider;

use chrono::{DateTime, Utc};

use crate::types::WeatherReading;
use advisory::{crop_advisory, forecast_text, Conditions};

/// Assemble a reading, deriving forecast and advisory text from the raw fields.
pub(crate) fn build_reading(
    location: String,
    source: &str,
    conditions: &Conditions<'_>,
    thresholds: &AdvisoryThresholds,
    timestamp: DateTime<Utc>,
) -> WeatherReading {
    WeatherReading {
        location,
        temperature: conditions.temperature,
        humidity: conditions.humidity,
        rainfall_mm: conditions.rainfall_mm,
        wind_kmh: conditions.wind_kmh,
        condition: conditions.condition.to_string(),
        forecast_text: forecast_text(conditions),
        advisory_text: crop_advisory(conditions, thresholds),
        source: source.to_string(),
        timestamp,
    }
}
