// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Failover behavior observed through the public gateways.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use krishi::config::ResolvedConfig;
use krishi::failover::{BackoffPolicy, RegisteredProvider};
use krishi::providers::{Backend, GenerationProvider};
use krishi::types::{AttemptOutcome, Capability, GenerationRequest};
use krishi::{GatewayError, ProviderError, Services};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Clone, Copy)]
enum Reply {
    Text(&'static str),
    Fail(&'static str),
}

struct FakeLlm {
    name: &'static str,
    priority: u32,
    available: bool,
    reply: Reply,
    calls: AtomicUsize,
    last_system_prompt: std::sync::Mutex<Option<String>>,
}

impl FakeLlm {
    fn new(name: &'static str, priority: u32, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            available: true,
            reply,
            calls: AtomicUsize::new(0),
            last_system_prompt: std::sync::Mutex::new(None),
        })
    }

    fn unavailable(name: &'static str, priority: u32) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            available: false,
            reply: Reply::Text("should never be called"),
            calls: AtomicUsize::new(0),
            last_system_prompt: std::sync::Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Backend for FakeLlm {
    fn name(&self) -> &str {
        self.name
    }
    fn capability(&self) -> Capability {
        Capability::Generate
    }
    fn priority(&self) -> u32 {
        self.priority
    }
    fn is_available(&self) -> bool {
        self.available
    }
}

#[async_trait]
impl GenerationProvider for FakeLlm {
    fn model(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_system_prompt.lock() {
            *last = request.system_prompt.clone();
        }
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail(message) => Err(ProviderError::NetworkError(message.to_string())),
        }
    }
}

fn no_backoff() -> ResolvedConfig {
    ResolvedConfig {
        backoff_base_ms: 0,
        durable_cache: false,
        ..Default::default()
    }
}

fn services(config: &ResolvedConfig, providers: &[Arc<FakeLlm>]) -> Services {
    let providers: Vec<RegisteredProvider> = providers
        .iter()
        .map(|p| RegisteredProvider::from(p.clone() as Arc<dyn GenerationProvider>))
        .collect();
    Services::from_providers(config, providers, None).unwrap()
}

// ============================================================================
// Backoff
// ============================================================================

#[test]
fn test_backoff_formula() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.delay(0), Duration::from_millis(1000));
    assert_eq!(policy.delay(1), Duration::from_millis(2000));
    assert_eq!(policy.delay(2), Duration::from_millis(4000));
    assert_eq!(policy.delay(3), Duration::from_millis(5000));
    assert_eq!(policy.delay(63), Duration::from_millis(5000));
    assert_eq!(policy.delay(200), Duration::from_millis(5000));
}

#[test]
fn test_backoff_is_monotonic_and_capped() {
    let policy = BackoffPolicy::new(Duration::from_millis(150), Duration::from_millis(3000));
    let delays: Vec<Duration> = (0..40).map(|n| policy.delay(n)).collect();
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    assert!(delays.iter().all(|d| *d <= Duration::from_millis(3000)));
}

// ============================================================================
// Generation failover
// ============================================================================

#[tokio::test]
async fn test_unavailable_primary_is_never_invoked() {
    let a = FakeLlm::unavailable("a", 0);
    let b = FakeLlm::new("b", 1, Reply::Text("from b"));
    let services = services(&no_backoff(), &[a.clone(), b.clone()]);

    let generation = services.generation.generate("hello", None).await.unwrap();
    assert_eq!(generation.text, "from b");
    assert_eq!(generation.provider_name, "b");
    assert_eq!(generation.attempts, 1);
    assert_eq!(a.calls(), 0);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn test_empty_text_falls_through_to_next_provider() {
    let a = FakeLlm::new("A", 0, Reply::Text(""));
    let b = FakeLlm::new("B", 1, Reply::Text("ok"));
    let services = services(&no_backoff(), &[a, b]);

    let generation = services.generation.generate("hello", None).await.unwrap();
    assert_eq!(generation.text, "ok");
    assert_eq!(generation.provider_name, "B");
    assert_eq!(generation.attempts, 2);
    assert_eq!(generation.attempt_log[0].outcome, AttemptOutcome::EmptyResult);
    assert_eq!(generation.attempt_log[1].outcome, AttemptOutcome::Success);
}

#[tokio::test]
async fn test_all_failing_reports_one_reason_per_provider_in_order() {
    let a = FakeLlm::new("a", 0, Reply::Fail("quota exhausted"));
    let b = FakeLlm::new("b", 1, Reply::Fail("connection refused"));
    let c = FakeLlm::new("c", 2, Reply::Text("  \n "));
    // Registration order must not matter
    let services = services(&no_backoff(), &[c, b, a]);

    let err = services.generation.generate("hello", None).await.unwrap_err();
    match &err {
        GatewayError::AllProvidersFailed { capability, failures } => {
            assert_eq!(*capability, Capability::Generate);
            let names: Vec<&str> = failures.iter().map(|f| f.provider.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
            assert!(failures[0].reason.contains("quota exhausted"));
            assert!(failures[1].reason.contains("connection refused"));
            assert_eq!(failures[2].outcome, AttemptOutcome::EmptyResult);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("a ("));
    assert!(message.contains("c ("));
}

#[tokio::test]
async fn test_no_available_generation_providers() {
    let a = FakeLlm::unavailable("a", 0);
    let services = services(&no_backoff(), &[a]);

    let err = services.generation.generate("hello", None).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::NoProvidersAvailable {
            capability: Capability::Generate
        }
    ));
}

#[tokio::test]
async fn test_blank_prompt_rejected_without_calls() {
    let a = FakeLlm::new("a", 0, Reply::Text("ok"));
    let services = services(&no_backoff(), &[a.clone()]);

    let err = services.generation.generate("   ", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn test_default_system_prompt_applies_when_none_given() {
    let config = ResolvedConfig {
        system_prompt: Some("You advise farmers.".to_string()),
        ..no_backoff()
    };
    let a = FakeLlm::new("a", 0, Reply::Text("ok"));
    let services = services(&config, &[a.clone()]);

    services.generation.generate("hello", None).await.unwrap();
    assert_eq!(
        a.last_system_prompt.lock().unwrap().as_deref(),
        Some("You advise farmers.")
    );

    services.generation.generate("hello", Some("Be brief.")).await.unwrap();
    assert_eq!(a.last_system_prompt.lock().unwrap().as_deref(), Some("Be brief."));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_waits_between_failed_attempts() {
    let config = ResolvedConfig {
        backoff_base_ms: 1000,
        backoff_cap_ms: 5000,
        durable_cache: false,
        ..Default::default()
    };
    let a = FakeLlm::new("a", 0, Reply::Fail("down"));
    let b = FakeLlm::new("b", 1, Reply::Text("up"));
    let services = services(&config, &[a, b]);

    let start = tokio::time::Instant::now();
    let generation = services.generation.generate("hello", None).await.unwrap();
    assert_eq!(generation.provider_name, "b");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1100), "{elapsed:?}");
}
