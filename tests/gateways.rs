// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Weather and embedding gateways against in-process fake providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use krishi::cache::{CacheStore, EmbeddingCache, ManualClock, SqliteStore};
use krishi::config::ResolvedConfig;
use krishi::failover::{
    BackoffPolicy, FailoverOrchestrator, HealthMonitor, HealthSettings, ProviderRegistry,
    RegisteredProvider,
};
use krishi::gateway::weather::{default_weather_cache_settings, WEATHER_NAMESPACE};
use krishi::gateway::WeatherGateway;
use krishi::providers::{Backend, EmbeddingProvider, WeatherProvider};
use krishi::types::{Capability, EmbeddingVector, WeatherReading};
use krishi::{GatewayError, ProviderError, Services};

// ============================================================================
// Fakes
// ============================================================================

struct FakeWeather {
    name: &'static str,
    priority: u32,
    healthy: bool,
    fetches: AtomicUsize,
    probes: AtomicUsize,
    delay: Duration,
}

impl FakeWeather {
    fn new(name: &'static str, priority: u32) -> Arc<Self> {
        Arc::new(Self::base(name, priority))
    }

    fn unhealthy(name: &'static str, priority: u32) -> Arc<Self> {
        Arc::new(Self {
            healthy: false,
            ..Self::base(name, priority)
        })
    }

    fn slow(name: &'static str, priority: u32, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::base(name, priority)
        })
    }

    fn base(name: &'static str, priority: u32) -> Self {
        Self {
            name,
            priority,
            healthy: true,
            fetches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Backend for FakeWeather {
    fn name(&self) -> &str {
        self.name
    }
    fn capability(&self) -> Capability {
        Capability::Weather
    }
    fn priority(&self) -> u32 {
        self.priority
    }
    fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherReading, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(WeatherReading {
            location: location.trim().to_string(),
            temperature: 31.0,
            humidity: 62.0,
            rainfall_mm: 0.0,
            wind_kmh: 9.0,
            condition: "clear sky".to_string(),
            forecast_text: "Clear sky, 31°C".to_string(),
            advisory_text: "Good conditions for field work".to_string(),
            source: self.name.to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok(())
        } else {
            Err(ProviderError::NetworkError("probe failed".to_string()))
        }
    }
}

struct FakeEmbedder {
    name: &'static str,
    priority: u32,
    model: &'static str,
    fail: bool,
    dimensions: usize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FakeEmbedder {
    fn new(name: &'static str, priority: u32, model: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            model,
            fail: false,
            dimensions: 3,
            batches: Mutex::new(Vec::new()),
        })
    }

    /// Advertises a width its vectors do not have.
    fn mismatched(name: &'static str, priority: u32, model: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            model,
            fail: false,
            dimensions: 1536,
            batches: Mutex::new(Vec::new()),
        })
    }

    fn failing(name: &'static str, priority: u32, model: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            model,
            fail: true,
            dimensions: 3,
            batches: Mutex::new(Vec::new()),
        })
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl Backend for FakeEmbedder {
    fn name(&self) -> &str {
        self.name
    }
    fn capability(&self) -> Capability {
        Capability::Embed
    }
    fn priority(&self) -> u32 {
        self.priority
    }
    fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn model(&self) -> &str {
        self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        self.batches.lock().unwrap().push(texts.to_vec());
        if self.fail {
            return Err(ProviderError::RateLimited("slow down".to_string()));
        }
        Ok(texts.iter().map(|t| vector_for(t)).collect())
    }
}

fn vector_for(text: &str) -> EmbeddingVector {
    let len = text.len() as f32;
    EmbeddingVector::new(vec![len, len / 2.0, 1.0])
}

fn weather_gateway(
    providers: &[Arc<FakeWeather>],
    clock: Arc<ManualClock>,
) -> WeatherGateway {
    let mut registry = ProviderRegistry::new();
    for p in providers {
        registry.register(p.clone() as Arc<dyn WeatherProvider>).unwrap();
    }
    let orchestrator = FailoverOrchestrator::new(Arc::new(registry), BackoffPolicy::none());
    let cache = CacheStore::new(WEATHER_NAMESPACE, default_weather_cache_settings()).with_clock(clock);
    WeatherGateway::new(
        orchestrator,
        Arc::new(HealthMonitor::new(HealthSettings::default())),
        Arc::new(cache),
    )
}

fn embedding_services(providers: &[Arc<FakeEmbedder>]) -> Services {
    let config = ResolvedConfig {
        backoff_base_ms: 0,
        durable_cache: false,
        ..Default::default()
    };
    let providers: Vec<RegisteredProvider> = providers
        .iter()
        .map(|p| RegisteredProvider::from(p.clone() as Arc<dyn EmbeddingProvider>))
        .collect();
    Services::from_providers(&config, providers, None).unwrap()
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Weather Gateway
// ============================================================================

#[tokio::test]
async fn test_weather_ttl_boundary() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let provider = FakeWeather::new("fake-weather", 0);
    let gateway = weather_gateway(&[provider.clone()], clock.clone());

    gateway.get_weather("Nagpur").await.unwrap();
    assert_eq!(provider.fetches(), 1);

    clock.advance(Duration::from_millis(599_999));
    let lookup = gateway.get_weather_detailed("Nagpur").await.unwrap();
    assert!(lookup.cached);
    assert_eq!(provider.fetches(), 1);

    clock.advance(Duration::from_millis(2));
    let lookup = gateway.get_weather_detailed("Nagpur").await.unwrap();
    assert!(!lookup.cached);
    assert_eq!(provider.fetches(), 2);
}

#[tokio::test]
async fn test_weather_keys_are_normalized() {
    let clock = Arc::new(ManualClock::new(0));
    let provider = FakeWeather::new("fake-weather", 0);
    let gateway = weather_gateway(&[provider.clone()], clock);

    let first = gateway.get_weather("  Pune ").await.unwrap();
    let second = gateway.get_weather("pune").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.fetches(), 1);
    assert_eq!(gateway.cache().memory_len(), 1);
    assert!(gateway.cache().get("pune").is_some());
}

#[tokio::test]
async fn test_concurrent_cold_lookups_leave_one_entry() {
    let clock = Arc::new(ManualClock::new(0));
    let provider = FakeWeather::slow("fake-weather", 0, Duration::from_millis(20));
    let gateway = weather_gateway(&[provider], clock);

    let (a, b) = tokio::join!(gateway.get_weather("Delhi"), gateway.get_weather("Delhi"));
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(gateway.cache().memory_len(), 1);
    assert!(gateway.cache().get("delhi").is_some());
}

#[tokio::test]
async fn test_unhealthy_weather_provider_is_skipped() {
    let clock = Arc::new(ManualClock::new(0));
    let sick = FakeWeather::unhealthy("sick", 0);
    let well = FakeWeather::new("well", 1);
    let gateway = weather_gateway(&[sick.clone(), well.clone()], clock);

    let lookup = gateway.get_weather_detailed("Indore").await.unwrap();
    assert_eq!(lookup.reading.source, "well");
    assert_eq!(sick.fetches(), 0);
    assert_eq!(lookup.attempts.len(), 2);
    assert!(!lookup.attempts[0].succeeded());
    assert!(lookup.attempts[1].succeeded());
}

#[tokio::test]
async fn test_health_status_is_reused_within_max_age() {
    let clock = Arc::new(ManualClock::new(0));
    let provider = FakeWeather::new("fake-weather", 0);
    let gateway = weather_gateway(&[provider.clone()], clock);

    gateway.get_weather("Surat").await.unwrap();
    gateway.get_weather("Rajkot").await.unwrap();
    assert_eq!(provider.fetches(), 2);
    assert_eq!(provider.probes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_weather_failure_is_not_fabricated_or_cached() {
    let clock = Arc::new(ManualClock::new(0));
    let sick = FakeWeather::unhealthy("sick", 0);
    let gateway = weather_gateway(&[sick], clock);

    let err = gateway.get_weather("Patna").await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::AllProvidersFailed {
            capability: Capability::Weather,
            ..
        }
    ));
    assert_eq!(gateway.cache().memory_len(), 0);
}

#[tokio::test]
async fn test_blank_location_rejected() {
    let provider = FakeWeather::new("fake-weather", 0);
    let gateway = weather_gateway(&[provider.clone()], Arc::new(ManualClock::new(0)));

    let err = gateway.get_weather("   ").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert_eq!(provider.fetches(), 0);
}

#[tokio::test]
async fn test_weather_survives_restart_through_durable_tier() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("cache.db");
    let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp_millis()));

    let first = FakeWeather::new("fake-weather", 0);
    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let mut registry = ProviderRegistry::new();
        registry.register(first.clone() as Arc<dyn WeatherProvider>).unwrap();
        let gateway = WeatherGateway::new(
            FailoverOrchestrator::new(Arc::new(registry), BackoffPolicy::none()),
            Arc::new(HealthMonitor::default()),
            Arc::new(
                CacheStore::new(WEATHER_NAMESPACE, default_weather_cache_settings())
                    .with_durable(store)
                    .with_clock(clock.clone()),
            ),
        );
        gateway.get_weather("Ludhiana").await.unwrap();
    }

    let second = FakeWeather::new("fake-weather", 0);
    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let mut registry = ProviderRegistry::new();
    registry.register(second.clone() as Arc<dyn WeatherProvider>).unwrap();
    let gateway = WeatherGateway::new(
        FailoverOrchestrator::new(Arc::new(registry), BackoffPolicy::none()),
        Arc::new(HealthMonitor::default()),
        Arc::new(
            CacheStore::new(WEATHER_NAMESPACE, default_weather_cache_settings())
                .with_durable(store)
                .with_clock(clock),
        ),
    );

    let lookup = gateway.get_weather_detailed("ludhiana").await.unwrap();
    assert!(lookup.cached);
    assert_eq!(first.fetches(), 1);
    assert_eq!(second.fetches(), 0);
}

// ============================================================================
// Embedding Cache and Gateway
// ============================================================================

#[test]
fn test_embedding_cache_round_trip() {
    let cache = EmbeddingCache::new();
    let vector = EmbeddingVector::new(vec![0.25, -0.5, 1.0]);

    cache.set("yellow rust on wheat", "m1", vector.clone());
    assert_eq!(cache.get("yellow rust on wheat", "m1"), Some(vector));
    assert_eq!(cache.get("yellow rust on wheat", "m2"), None);
    assert_eq!(cache.get("brown rust on wheat", "m1"), None);
}

#[tokio::test]
async fn test_second_embed_served_from_cache() {
    let provider = FakeEmbedder::new("embed-a", 0, "m1");
    let services = embedding_services(&[provider.clone()]);
    let input = texts(&["drip irrigation", "mulching"]);

    let first = services.embedding.embed(&input).await.unwrap();
    assert_eq!(first.provider_name.as_deref(), Some("embed-a"));
    assert_eq!(first.cache_hits, 0);

    let second = services.embedding.embed(&input).await.unwrap();
    assert_eq!(second.provider_name, None);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.vectors, first.vectors);
    assert_eq!(provider.batches().len(), 1);
}

#[tokio::test]
async fn test_partial_hits_only_embed_misses() {
    let provider = FakeEmbedder::new("embed-a", 0, "m1");
    let services = embedding_services(&[provider.clone()]);
    services
        .embedding
        .cache()
        .set("neem oil", "m1", vector_for("neem oil"));

    let input = texts(&["crop rotation", "neem oil", "vermicompost"]);
    let result = services.embedding.embed(&input).await.unwrap();

    assert_eq!(result.cache_hits, 1);
    assert_eq!(result.model, "m1");
    assert_eq!(provider.batches(), vec![texts(&["crop rotation", "vermicompost"])]);
    let expected: Vec<EmbeddingVector> = input.iter().map(|t| vector_for(t)).collect();
    assert_eq!(result.vectors, expected);
}

#[tokio::test]
async fn test_fallback_model_embeds_whole_batch() {
    let primary = FakeEmbedder::failing("embed-a", 0, "m1");
    let fallback = FakeEmbedder::new("embed-b", 1, "m2");
    let services = embedding_services(&[primary.clone(), fallback.clone()]);
    services
        .embedding
        .cache()
        .set("soil testing", "m1", vector_for("soil testing"));

    let input = texts(&["soil testing", "green manure"]);
    let result = services.embedding.embed(&input).await.unwrap();

    assert_eq!(result.model, "m2");
    assert_eq!(result.provider_name.as_deref(), Some("embed-b"));
    assert_eq!(result.cache_hits, 0);
    assert_eq!(result.vectors.len(), 2);
    assert_eq!(primary.batches(), vec![texts(&["green manure"])]);
    assert_eq!(fallback.batches(), vec![input.clone()]);
    assert!(services.embedding.cache().get("soil testing", "m2").is_some());
}

#[tokio::test]
async fn test_wrong_width_vectors_fail_over_and_are_not_cached() {
    let primary = FakeEmbedder::mismatched("embed-a", 0, "m1");
    let fallback = FakeEmbedder::new("embed-b", 1, "m2");
    let services = embedding_services(&[primary.clone(), fallback.clone()]);

    let input = texts(&["drip irrigation"]);
    let result = services.embedding.embed(&input).await.unwrap();

    assert_eq!(result.provider_name.as_deref(), Some("embed-b"));
    assert_eq!(result.vectors[0].dimensions, 3);
    assert_eq!(primary.batches().len(), 1);
    assert!(services.embedding.cache().get("drip irrigation", "m1").is_none());
}

#[tokio::test]
async fn test_embed_with_no_providers() {
    let services = embedding_services(&[]);
    let err = services
        .embedding
        .embed(&texts(&["anything"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::NoProvidersAvailable {
            capability: Capability::Embed
        }
    ));
}

#[tokio::test]
async fn test_embed_empty_input_rejected() {
    let provider = FakeEmbedder::new("embed-a", 0, "m1");
    let services = embedding_services(&[provider.clone()]);

    let err = services.embedding.embed(&[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert!(provider.batches().is_empty());
}
