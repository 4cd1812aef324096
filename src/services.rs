// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Startup wiring: one registry, one health monitor, shared caches and the
//! three gateways, all built once and handed to callers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{default_cache_path, CacheStore, DurableStore, EmbeddingCache, SqliteStore};
use crate::config::{Credentials, ResolvedConfig};
use crate::error::RegistryError;
use crate::failover::{
    CapabilityKind, FailoverOrchestrator, HealthMonitor, ProviderRegistry, RegisteredProvider,
};
use crate::gateway::weather::WEATHER_NAMESPACE;
use crate::gateway::{EmbeddingGateway, GenerationGateway, WeatherGateway};
use crate::providers::{create_provider, ProviderKind, WeatherProvider};
use crate::types::Capability;

/// Everything a caller needs, constructor-injected.
#[derive(Debug)]
pub struct Services {
    pub registry: Arc<ProviderRegistry>,
    pub health: Arc<HealthMonitor>,
    pub weather: WeatherGateway,
    pub generation: GenerationGateway,
    pub embedding: EmbeddingGateway,
    durable: Option<Arc<SqliteStore>>,
    health_check_interval: Option<Duration>,
}

impl Services {
    /// Build every built-in provider from config and environment credentials.
    ///
    /// A durable cache that cannot be opened is logged and skipped; the
    /// memory tier still works.
    pub fn from_config(config: &ResolvedConfig, credentials: &Credentials) -> Result<Self, RegistryError> {
        let providers = ProviderKind::ALL
            .into_iter()
            .map(|kind| create_provider(kind, credentials, config.provider_settings(kind.name())))
            .collect();

        let durable = if config.durable_cache {
            open_durable(config.cache_path.clone())
        } else {
            None
        };

        Self::from_providers(config, providers, durable)
    }

    /// Build from an explicit provider list and optional durable store.
    pub fn from_providers(
        config: &ResolvedConfig,
        providers: Vec<RegisteredProvider>,
        durable: Option<Arc<SqliteStore>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider)?;
        }
        let registry = Arc::new(registry);

        let orchestrator = FailoverOrchestrator::new(Arc::clone(&registry), config.backoff());
        let health = Arc::new(HealthMonitor::new(config.health_settings()));

        let mut weather_cache = CacheStore::new(WEATHER_NAMESPACE, config.weather_cache_settings());
        let mut embedding_cache = EmbeddingCache::with_settings(config.embedding_cache_settings());
        if let Some(store) = &durable {
            let store: Arc<dyn DurableStore> = store.clone();
            weather_cache = weather_cache.with_durable(Arc::clone(&store));
            embedding_cache = embedding_cache.with_durable(store);
        }

        Ok(Self {
            weather: WeatherGateway::new(
                orchestrator.clone(),
                Arc::clone(&health),
                Arc::new(weather_cache),
            ),
            generation: GenerationGateway::new(orchestrator.clone())
                .with_default_system_prompt(config.system_prompt.clone()),
            embedding: EmbeddingGateway::new(orchestrator, Arc::new(embedding_cache)),
            registry,
            health,
            durable,
            health_check_interval: config.health_check_interval_ms.map(Duration::from_millis),
        })
    }

    /// The SQLite tier shared by both caches, if enabled.
    pub fn durable(&self) -> Option<&Arc<SqliteStore>> {
        self.durable.as_ref()
    }

    /// Start background weather probing if an interval is configured.
    ///
    /// The caller owns the handle; aborting it stops probing.
    pub fn spawn_health_task(&self) -> Option<JoinHandle<()>> {
        let interval = self.health_check_interval.filter(|i| !i.is_zero())?;
        let providers: Vec<Arc<dyn WeatherProvider>> = self
            .registry
            .all(Capability::Weather)
            .iter()
            .filter_map(<dyn WeatherProvider as CapabilityKind>::extract)
            .collect();
        debug!(interval_ms = interval.as_millis() as u64, count = providers.len(), "Starting periodic health probes");
        Some(Arc::clone(&self.health).spawn_periodic(providers, interval))
    }
}

fn open_durable(path: Option<PathBuf>) -> Option<Arc<SqliteStore>> {
    let path = path.or_else(default_cache_path)?;
    match SqliteStore::open(&path) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Durable cache unavailable; using memory only");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_registers_every_provider() {
        let config = ResolvedConfig {
            durable_cache: false,
            ..Default::default()
        };
        let services = Services::from_config(&config, &Credentials::default()).unwrap();

        assert_eq!(services.registry.len(), ProviderKind::ALL.len());
        assert!(services.durable().is_none());
        // Nothing configured: only the keyless weather source is usable
        let names: Vec<String> = services
            .registry
            .available_providers(Capability::Weather)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["open-meteo"]);
        assert!(services.registry.available_providers(Capability::Generate).is_empty());
    }

    #[test]
    fn test_durable_store_opened_at_configured_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("cache.db");
        let config = ResolvedConfig {
            cache_path: Some(path.clone()),
            ..Default::default()
        };

        let services = Services::from_config(&config, &Credentials::default()).unwrap();
        assert_eq!(services.durable().and_then(|d| d.path()), Some(path.as_path()));
        assert!(services.weather.cache().has_durable());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_no_health_task_without_interval() {
        let config = ResolvedConfig {
            durable_cache: false,
            ..Default::default()
        };
        let services = Services::from_config(&config, &Credentials::default()).unwrap();
        assert!(services.spawn_health_task().is_none());
    }
}
