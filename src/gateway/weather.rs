// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Weather Gateway: normalized, cached, health-checked weather lookup.
//!
//! ```text
//! get_weather("  Pune ")
//!   -> key "pune"
//!   -> cache hit? return it
//!   -> failover over weather providers (health check, then fetch)
//!   -> cache and return
//! ```

use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::cache::{CacheSettings, CacheStore};
use crate::error::{GatewayError, ProviderError};
use crate::failover::{FailoverOrchestrator, HealthMonitor};
use crate::providers::WeatherProvider;
use crate::types::{AttemptRecord, WeatherReading};

/// Durable-store namespace for weather readings.
pub const WEATHER_NAMESPACE: &str = "weather";

/// Default freshness window for a cached reading (10 minutes).
pub const DEFAULT_WEATHER_TTL: Duration = Duration::from_secs(10 * 60);

/// Default number of locations kept in memory.
pub const DEFAULT_WEATHER_CAPACITY: usize = 500;

/// Default cache settings for weather readings.
pub fn default_weather_cache_settings() -> CacheSettings {
    CacheSettings::new(DEFAULT_WEATHER_TTL, DEFAULT_WEATHER_CAPACITY)
}

/// Cache key for a location: lowercased, trimmed, internal whitespace collapsed.
///
/// Returns `None` when nothing is left.
pub fn normalize_location(text: &str) -> Option<String> {
    let key = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!key.is_empty()).then_some(key)
}

/// A reading plus how it was obtained.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherLookup {
    pub reading: WeatherReading,
    /// Served from cache without contacting any provider.
    pub cached: bool,
    /// Provider attempts made for this call. Empty when cached.
    pub attempts: Vec<AttemptRecord>,
}

/// Weather lookups across all registered weather providers.
#[derive(Debug, Clone)]
pub struct WeatherGateway {
    orchestrator: FailoverOrchestrator,
    health: Arc<HealthMonitor>,
    cache: Arc<CacheStore<WeatherReading>>,
}

impl WeatherGateway {
    pub fn new(
        orchestrator: FailoverOrchestrator,
        health: Arc<HealthMonitor>,
        cache: Arc<CacheStore<WeatherReading>>,
    ) -> Self {
        Self {
            orchestrator,
            health,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore<WeatherReading>> {
        &self.cache
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Current conditions for `location`.
    ///
    /// Never fabricates a reading: when no provider succeeds the failover
    /// error is returned as is.
    pub async fn get_weather(&self, location: &str) -> Result<WeatherReading, GatewayError> {
        self.get_weather_detailed(location).await.map(|lookup| lookup.reading)
    }

    /// Like [`get_weather`](Self::get_weather), also reporting cache use and attempts.
    pub async fn get_weather_detailed(&self, location: &str) -> Result<WeatherLookup, GatewayError> {
        let key = normalize_location(location)
            .ok_or_else(|| GatewayError::InvalidInput("location is empty".to_string()))?;

        if let Some(reading) = self.cache.get(&key) {
            debug!(key = %key, source = %reading.source, "Weather cache hit");
            return Ok(WeatherLookup {
                reading,
                cached: true,
                attempts: Vec::new(),
            });
        }

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let health = Arc::clone(&self.health);
        let original = location.to_string();
        let execution = self
            .orchestrator
            .execute::<dyn WeatherProvider, _, _, _>(|provider| {
                let health = Arc::clone(&health);
                let location = original.clone();
                async move {
                    if !health.check_weather(&*provider).await {
                        return Err(ProviderError::Unhealthy(format!(
                            "{} failed its health check",
                            provider.name()
                        )));
                    }
                    provider.fetch_weather(&location).await
                }
            })
            .await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("gateway.weather", start.elapsed());

        let execution = execution?;
        self.cache.set(&key, execution.value.clone());

        Ok(WeatherLookup {
            reading: execution.value,
            cached: false,
            attempts: execution.attempts,
        })
    }
}
