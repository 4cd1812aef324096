// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Health Monitor: cheap liveness answers for the failover hot path.
//!
//! Weather providers are probed live, bounded by a hard timeout. Generation
//! and embedding providers only get the synchronous credential check on the
//! hot path, since a live probe there costs paid tokens; their live probe is
//! an explicit diagnostic.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::registry::RegisteredProvider;
use crate::error::ProviderError;
use crate::providers::{EmbeddingProvider, GenerationProvider, WeatherProvider};
use crate::types::Capability;

/// Default hard bound on a weather probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default reuse window for a cached status.
pub const DEFAULT_MAX_STATUS_AGE: Duration = Duration::from_secs(30);

/// Default bound on an explicit diagnostic probe.
pub const DEFAULT_DIAGNOSTIC_TIMEOUT: Duration = Duration::from_secs(30);

/// Health monitor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSettings {
    pub probe_timeout: Duration,
    /// Zero disables reuse: every check probes.
    pub max_status_age: Duration,
    pub diagnostic_timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_status_age: DEFAULT_MAX_STATUS_AGE,
            diagnostic_timeout: DEFAULT_DIAGNOSTIC_TIMEOUT,
        }
    }
}

/// Last known health of one provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub provider: String,
    pub capability: Capability,
    pub healthy: bool,
    pub last_checked_at: DateTime<Utc>,
    /// Whether the answer came from a live request rather than a credential check.
    pub live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedStatus {
    status: HealthStatus,
    checked: Instant,
}

/// Per-provider health cache and probe runner.
#[derive(Debug, Default)]
pub struct HealthMonitor {
    settings: HealthSettings,
    statuses: RwLock<HashMap<String, CachedStatus>>,
}

impl HealthMonitor {
    pub fn new(settings: HealthSettings) -> Self {
        Self {
            settings,
            statuses: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> HealthSettings {
        self.settings
    }

    /// Hot-path check for any registered provider.
    pub async fn check(&self, provider: &RegisteredProvider) -> bool {
        match provider {
            RegisteredProvider::Weather(p) => self.check_weather(p.as_ref()).await,
            RegisteredProvider::Generation(p) => self.check_generation(p.as_ref()),
            RegisteredProvider::Embedding(p) => self.check_embedding(p.as_ref()),
        }
    }

    /// Live probe of a weather provider, reusing a fresh cached status.
    ///
    /// Never errors and never waits longer than the probe timeout.
    pub async fn check_weather(&self, provider: &dyn WeatherProvider) -> bool {
        if !provider.is_available() {
            self.store(self.unconfigured(provider.name(), Capability::Weather));
            return false;
        }
        if let Some(healthy) = self.fresh(provider.name()) {
            return healthy;
        }
        self.probe_weather(provider).await.healthy
    }

    /// Credential check only. Never touches the network.
    pub fn check_generation(&self, provider: &dyn GenerationProvider) -> bool {
        self.check_credentials(provider.name(), Capability::Generate, provider.is_available())
    }

    /// Credential check only. Never touches the network.
    pub fn check_embedding(&self, provider: &dyn EmbeddingProvider) -> bool {
        self.check_credentials(provider.name(), Capability::Embed, provider.is_available())
    }

    fn check_credentials(&self, name: &str, capability: Capability, available: bool) -> bool {
        let status = if available {
            HealthStatus {
                provider: name.to_string(),
                capability,
                healthy: true,
                last_checked_at: Utc::now(),
                live: false,
                detail: None,
            }
        } else {
            self.unconfigured(name, capability)
        };
        self.store(status);
        available
    }

    /// Probe a weather provider now, ignoring any cached status.
    pub async fn probe_weather(&self, provider: &dyn WeatherProvider) -> HealthStatus {
        let status = self
            .run_probe(
                provider.name(),
                Capability::Weather,
                self.settings.probe_timeout,
                provider.probe(),
            )
            .await;
        self.store(status.clone());
        status
    }

    /// Explicit live diagnostic for a generation provider. Spends quota.
    pub async fn diagnose_generation(&self, provider: &dyn GenerationProvider) -> HealthStatus {
        if !provider.is_available() {
            return self.unconfigured(provider.name(), Capability::Generate);
        }
        let status = self
            .run_probe(
                provider.name(),
                Capability::Generate,
                self.settings.diagnostic_timeout,
                provider.probe(),
            )
            .await;
        self.store(status.clone());
        status
    }

    /// Explicit live diagnostic for an embedding provider.
    pub async fn diagnose_embedding(&self, provider: &dyn EmbeddingProvider) -> HealthStatus {
        if !provider.is_available() {
            return self.unconfigured(provider.name(), Capability::Embed);
        }
        let status = self
            .run_probe(
                provider.name(),
                Capability::Embed,
                self.settings.diagnostic_timeout,
                provider.probe(),
            )
            .await;
        self.store(status.clone());
        status
    }

    /// Live diagnostic for any registered provider.
    pub async fn diagnose(&self, provider: &RegisteredProvider) -> HealthStatus {
        match provider {
            RegisteredProvider::Weather(p) => {
                if !p.is_available() {
                    return self.unconfigured(p.name(), Capability::Weather);
                }
                self.probe_weather(p.as_ref()).await
            }
            RegisteredProvider::Generation(p) => self.diagnose_generation(p.as_ref()).await,
            RegisteredProvider::Embedding(p) => self.diagnose_embedding(p.as_ref()).await,
        }
    }

    /// Snapshot of every cached status, sorted by provider name.
    pub fn statuses(&self) -> Vec<HealthStatus> {
        let mut statuses: Vec<HealthStatus> = self
            .statuses
            .read()
            .map(|map| map.values().map(|c| c.status.clone()).collect())
            .unwrap_or_default();
        statuses.sort_by(|a, b| a.provider.cmp(&b.provider));
        statuses
    }

    /// Re-probe `providers` every `interval` until the handle is aborted.
    pub fn spawn_periodic(
        self: Arc<Self>,
        providers: Vec<Arc<dyn WeatherProvider>>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                for provider in providers.iter().filter(|p| p.is_available()) {
                    let status = self.probe_weather(provider.as_ref()).await;
                    debug!(provider = %status.provider, healthy = status.healthy, "Periodic health probe");
                }
            }
        })
    }

    fn fresh(&self, name: &str) -> Option<bool> {
        let max_age = self.settings.max_status_age;
        if max_age.is_zero() {
            return None;
        }
        let statuses = self.statuses.read().ok()?;
        let cached = statuses.get(name)?;
        (cached.checked.elapsed() < max_age).then_some(cached.status.healthy)
    }

    fn store(&self, status: HealthStatus) {
        if let Ok(mut statuses) = self.statuses.write() {
            statuses.insert(
                status.provider.clone(),
                CachedStatus {
                    status,
                    checked: Instant::now(),
                },
            );
        }
    }

    async fn run_probe<F>(
        &self,
        name: &str,
        capability: Capability,
        bound: Duration,
        probe: F,
    ) -> HealthStatus
    where
        F: Future<Output = Result<(), ProviderError>>,
    {
        let outcome = match tokio::time::timeout(bound, probe).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(ProviderError::Timeout(bound.as_millis() as u64).to_string()),
        };

        if let Err(reason) = &outcome {
            warn!(provider = %name, reason = %reason, "Health probe failed");
        }

        HealthStatus {
            provider: name.to_string(),
            capability,
            healthy: outcome.is_ok(),
            last_checked_at: Utc::now(),
            live: true,
            detail: outcome.err(),
        }
    }

    fn unconfigured(&self, name: &str, capability: Capability) -> HealthStatus {
        HealthStatus {
            provider: name.to_string(),
            capability,
            healthy: false,
            last_checked_at: Utc::now(),
            live: false,
            detail: Some("credential missing or placeholder".to_string()),
        }
    }
}
