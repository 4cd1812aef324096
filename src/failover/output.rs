// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Result validation applied by the orchestrator before accepting a provider's output.

use std::fmt;

use crate::types::{EmbeddingVector, WeatherReading};

/// Why a provider's otherwise successful response was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing usable came back.
    Empty(String),
    /// Something came back but it violates the result's shape.
    Malformed(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty(msg) => write!(f, "empty result: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed result: {}", msg),
        }
    }
}

/// A value a provider can return through the failover orchestrator.
pub trait ProviderOutput {
    /// Accept or reject the value.
    fn check(&self) -> Result<(), Rejection>;
}

impl ProviderOutput for String {
    fn check(&self) -> Result<(), Rejection> {
        if self.trim().is_empty() {
            Err(Rejection::Empty("response text is blank".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ProviderOutput for WeatherReading {
    fn check(&self) -> Result<(), Rejection> {
        let numbers = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("rainfall", self.rainfall_mm),
            ("wind", self.wind_kmh),
        ];
        if let Some((field, _)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Rejection::Malformed(format!("{} is not a finite number", field)));
        }
        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(Rejection::Malformed(format!(
                "humidity {} outside 0-100%",
                self.humidity
            )));
        }
        if self.rainfall_mm < 0.0 || self.wind_kmh < 0.0 {
            return Err(Rejection::Malformed("negative rainfall or wind speed".to_string()));
        }
        if !(-90.0..=60.0).contains(&self.temperature) {
            return Err(Rejection::Malformed(format!(
                "implausible temperature {}°C",
                self.temperature
            )));
        }
        Ok(())
    }
}

impl ProviderOutput for Vec<EmbeddingVector> {
    fn check(&self) -> Result<(), Rejection> {
        if self.is_empty() {
            return Err(Rejection::Empty("no vectors returned".to_string()));
        }
        if let Some(index) = self.iter().position(|v| !v.is_well_formed()) {
            return Err(Rejection::Malformed(format!(
                "vector {} is empty or contains non-finite values",
                index
            )));
        }
        let dims = self[0].dimensions;
        if self.iter().any(|v| v.dimensions != dims) {
            return Err(Rejection::Malformed("vectors have mixed dimensions".to_string()));
        }
        Ok(())
    }
}
