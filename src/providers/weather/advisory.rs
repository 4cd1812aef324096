// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Forecast and crop-advisory text derived from raw weather fields.
//!
//! Each provider reports rain over a different window, so each carries its
//! own thresholds.

/// Raw fields the advisory rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions<'a> {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall_mm: f64,
    pub wind_kmh: f64,
    pub condition: &'a str,
}

/// Per-provider advisory thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvisoryThresholds {
    /// Humidity (%) at or above which fungal disease risk is flagged.
    pub disease_humidity: f64,
    /// Temperature (°C) above which a rainless reading counts as dry.
    pub dry_temperature: f64,
    pub heavy_rain_mm: f64,
    pub strong_wind_kmh: f64,
    /// Temperature (°C) below which cold stress is flagged.
    pub cold_temperature: f64,
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self {
            disease_humidity: 80.0,
            dry_temperature: 30.0,
            heavy_rain_mm: 20.0,
            strong_wind_kmh: 30.0,
            cold_temperature: 10.0,
        }
    }
}

/// One-line description of current conditions.
pub fn forecast_text(c: &Conditions<'_>) -> String {
    let mut text = format!(
        "{}, {:.1}°C, humidity {:.0}%",
        capitalize(c.condition),
        c.temperature,
        c.humidity
    );
    if c.rainfall_mm > 0.0 {
        text.push_str(&format!(", rain {:.1} mm", c.rainfall_mm));
    }
    text.push_str(&format!(", wind {:.0} km/h", c.wind_kmh));
    text
}

/// Crop advisory built from threshold rules. Never empty.
pub fn crop_advisory(c: &Conditions<'_>, t: &AdvisoryThresholds) -> String {
    let mut notes: Vec<&str> = Vec::new();

    if c.humidity >= t.disease_humidity {
        notes.push("High humidity raises fungal disease risk; scout for blight and mildew and avoid evening irrigation.");
    }
    if c.rainfall_mm <= 0.0 && c.temperature > t.dry_temperature {
        notes.push("Dry, hot conditions; irrigate early morning or evening and mulch to conserve soil moisture.");
    }
    if c.rainfall_mm >= t.heavy_rain_mm {
        notes.push("Heavy rain; clear field drainage and postpone fertilizer or pesticide application.");
    }
    if c.wind_kmh >= t.strong_wind_kmh {
        notes.push("Strong wind; avoid spraying and stake tall crops.");
    }
    if c.temperature < t.cold_temperature {
        notes.push("Cold stress possible; protect nurseries and young seedlings overnight.");
    }

    if notes.is_empty() {
        "Conditions are favorable for routine field operations.".to_string()
    } else {
        notes.join(" ")
    }
}

fn capitalize(s: &str) -> String {
    let s = s.trim();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown".to_string(),
    }
}
