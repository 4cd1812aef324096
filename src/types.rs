// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core type definitions shared by providers, the failover layer and the gateways.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Capability
// ============================================================================

/// The category of operation a provider performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Text generation (LLM backends)
    Generate,
    /// Current weather conditions
    Weather,
    /// Text-to-vector embeddings
    Embed,
}

impl Capability {
    /// All capabilities, in display order.
    pub const ALL: [Capability; 3] = [Self::Generate, Self::Weather, Self::Embed];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Weather => "weather",
            Self::Embed => "embed",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a capability from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCapabilityError;

impl fmt::Display for ParseCapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid capability (expected generate, weather or embed)")
    }
}

impl std::error::Error for ParseCapabilityError {}

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generate" | "generation" | "llm" => Ok(Self::Generate),
            "weather" => Ok(Self::Weather),
            "embed" | "embedding" | "embeddings" => Ok(Self::Embed),
            _ => Err(ParseCapabilityError),
        }
    }
}

// ============================================================================
// Attempt Records
// ============================================================================

/// How a single provider attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Error,
    EmptyResult,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::EmptyResult => write!(f, "empty_result"),
        }
    }
}

/// One provider invocation within a failover walk.
///
/// Attempt records exist for logging and diagnostics only; they are returned
/// alongside results and then dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub provider_name: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AttemptRecord {
    /// Whether this attempt produced the returned value.
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

// ============================================================================
// Weather
// ============================================================================

/// A structured weather reading as returned by any weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    /// Location as resolved by the provider.
    pub location: String,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Rainfall over the provider's reporting window.
    pub rainfall_mm: f64,
    pub wind_kmh: f64,
    /// Short condition label ("light rain", "clear sky", ...).
    pub condition: String,
    pub forecast_text: String,
    /// Qualitative crop advisory derived from the raw fields.
    pub advisory_text: String,
    /// Name of the provider that produced this reading.
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Generation
// ============================================================================

/// Input to a generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
}

impl GenerationRequest {
    /// Create a request with no system prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
        }
    }

    /// Attach a system prompt. Blank system prompts are dropped.
    pub fn with_system_prompt(mut self, system_prompt: Option<&str>) -> Self {
        self.system_prompt = system_prompt
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self
    }
}

/// Result of a successful generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub text: String,
    pub provider_name: String,
    /// Number of providers invoked, including the one that succeeded.
    pub attempts: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempt_log: Vec<AttemptRecord>,
}

// ============================================================================
// Embeddings
// ============================================================================

/// An embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// The embedding values.
    pub values: Vec<f32>,
    /// Dimension count.
    pub dimensions: usize,
}

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        let dimensions = values.len();
        Self { values, dimensions }
    }

    /// A vector is usable when it is non-empty and every value is finite.
    pub fn is_well_formed(&self) -> bool {
        !self.values.is_empty()
            && self.dimensions == self.values.len()
            && self.values.iter().all(|v| v.is_finite())
    }
}

/// Result of an embedding gateway call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Embeddings {
    /// One vector per input text, in input order.
    pub vectors: Vec<EmbeddingVector>,
    /// Model all vectors were produced by.
    pub model: String,
    /// Provider that served the uncached texts, or `None` if every text was cached.
    pub provider_name: Option<String>,
    pub cache_hits: usize,
}
