// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Capability traits implemented by every provider adapter.
//!
//! Every adapter implements [`Backend`] (identity, priority and the cheap
//! availability predicate) plus exactly one capability trait. The registry
//! stores adapters as `Arc<dyn …>` trait objects inside
//! [`RegisteredProvider`](crate::failover::RegisteredProvider).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{Capability, EmbeddingVector, GenerationRequest, WeatherReading};

/// Identity and availability shared by all provider adapters.
pub trait Backend: Send + Sync {
    /// Unique provider name (e.g. "gemini", "openweathermap").
    fn name(&self) -> &str;

    /// The capability this provider serves.
    fn capability(&self) -> Capability;

    /// Failover priority. Lower values are tried first.
    fn priority(&self) -> u32;

    /// Cheap synchronous availability check.
    ///
    /// Typically "is the credential configured and well-formed". Must never
    /// perform I/O.
    fn is_available(&self) -> bool;
}

/// A text generation backend.
#[async_trait]
pub trait GenerationProvider: Backend {
    /// Model identifier sent to the backend.
    fn model(&self) -> &str;

    /// Generate a completion for the request.
    ///
    /// Implementations must return [`ProviderError::EmptyResponse`] when the
    /// trimmed completion text is empty.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Live diagnostic probe. Consumes quota, so it is never run on the hot path.
    async fn probe(&self) -> Result<(), ProviderError> {
        let request = GenerationRequest::new("Reply with the single word OK.");
        self.generate(&request).await.map(|_| ())
    }
}

/// A current-weather backend.
#[async_trait]
pub trait WeatherProvider: Backend {
    /// Fetch current conditions for a free-text location.
    ///
    /// Receives the caller's original text; providers do their own matching
    /// of place names to stations or coordinates.
    async fn fetch_weather(&self, location: &str) -> Result<WeatherReading, ProviderError>;

    /// Lightweight liveness request against a minimal endpoint.
    ///
    /// The health monitor bounds this with its own hard timeout.
    async fn probe(&self) -> Result<(), ProviderError>;
}

/// A text-to-vector backend.
#[async_trait]
pub trait EmbeddingProvider: Backend {
    /// Get the model name.
    fn model(&self) -> &str;

    /// Get the embedding dimensions, or 0 when the model is not known
    /// until a response arrives.
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, one vector per text in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError>;

    /// Generate embedding for a single text.
    async fn embed_one(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse(self.name().to_string()))
    }

    /// Live diagnostic probe.
    async fn probe(&self) -> Result<(), ProviderError> {
        self.embed_one("ping").await.map(|_| ())
    }
}

/// Construction settings shared by all adapters.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Override the adapter's default failover priority.
    pub priority: Option<u32>,
    /// Override the adapter's default model.
    pub model: Option<String>,
    /// Override the adapter's default API base URL.
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Force the adapter unavailable regardless of credentials.
    pub disabled: bool,
}

impl ProviderSettings {
    /// Set the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Request timeout, falling back to the adapter's default.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_ms.map(Duration::from_millis).unwrap_or(default)
    }

    /// Base URL without trailing slash, falling back to the adapter's default.
    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Build the shared HTTP client for an adapter.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.timeout_or(Duration::from_secs(30)), Duration::from_secs(30));
        assert_eq!(settings.base_url_or("https://api.example.com/"), "https://api.example.com");
        assert!(!settings.disabled);
    }

    #[test]
    fn test_settings_builder() {
        let settings = ProviderSettings::default()
            .with_priority(7)
            .with_model("gemini-1.5-flash")
            .with_base_url("http://localhost:8080/");
        assert_eq!(settings.priority, Some(7));
        assert_eq!(settings.model.as_deref(), Some("gemini-1.5-flash"));
        assert_eq!(settings.base_url_or("unused"), "http://localhost:8080");
    }
}
