// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metrics collection for provider attempts and cache behaviour.
//!
//! Provides lightweight metrics collection without external dependencies.
//! A CLI or a single API process does not need a full observability stack.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::types::AttemptOutcome;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Attempt metrics by provider name.
    providers: RwLock<HashMap<String, ProviderMetrics>>,

    /// General operation metrics.
    operations: RwLock<HashMap<String, OperationMetrics>>,

    /// Cache lookups by namespace.
    caches: RwLock<HashMap<String, CacheCounters>>,

    /// Start time for calculating uptime.
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            operations: RwLock::new(HashMap::new()),
            caches: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record one provider attempt.
    pub fn record_attempt(&self, provider: &str, duration: Duration, outcome: AttemptOutcome) {
        if let Ok(mut providers) = self.providers.write() {
            providers
                .entry(provider.to_string())
                .or_insert_with(ProviderMetrics::new)
                .record(duration, outcome);
        }
    }

    /// Record a generic operation.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        if let Ok(mut ops) = self.operations.write() {
            ops.entry(name.to_string())
                .or_insert_with(OperationMetrics::new)
                .record(duration);
        }
    }

    /// Record a cache lookup.
    pub fn record_cache(&self, namespace: &str, hit: bool) {
        if let Ok(mut caches) = self.caches.write() {
            let counters = caches.entry(namespace.to_string()).or_default();
            if hit {
                counters.hits.fetch_add(1, Ordering::Relaxed);
            } else {
                counters.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get metrics for a specific provider.
    pub fn provider_metrics(&self, name: &str) -> Option<ProviderMetrics> {
        self.providers.read().ok()?.get(name).cloned()
    }

    /// Get metrics for a specific operation.
    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        self.operations.read().ok()?.get(name).cloned()
    }

    /// (hits, misses) for a cache namespace.
    pub fn cache_counts(&self, namespace: &str) -> (u64, u64) {
        self.caches
            .read()
            .ok()
            .and_then(|caches| caches.get(namespace).map(CacheCounters::load))
            .unwrap_or((0, 0))
    }

    /// Get uptime since metrics were initialized.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let providers = self
            .providers
            .read()
            .map(|p| p.clone())
            .unwrap_or_default();
        let operations = self
            .operations
            .read()
            .map(|o| o.clone())
            .unwrap_or_default();
        let caches = self
            .caches
            .read()
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.load())).collect())
            .unwrap_or_default();

        MetricsSnapshot {
            providers,
            operations,
            caches,
            uptime: self.uptime(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        if let Ok(mut p) = self.providers.write() {
            p.clear();
        }
        if let Ok(mut o) = self.operations.write() {
            o.clear();
        }
        if let Ok(mut c) = self.caches.write() {
            c.clear();
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempt metrics for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderMetrics {
    /// Total number of attempts.
    pub attempts: u64,

    pub successes: u64,

    /// Attempts that errored (exception, timeout, malformed data).
    pub errors: u64,

    /// Attempts that returned an empty result.
    pub empty_results: u64,

    /// Total time spent in this provider.
    pub total_duration: Duration,

    pub max_duration: Duration,

    /// Latency distribution.
    pub histogram: Histogram,
}

impl ProviderMetrics {
    /// Create new empty provider metrics.
    pub fn new() -> Self {
        Self {
            attempts: 0,
            successes: 0,
            errors: 0,
            empty_results: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    /// Record an attempt.
    pub fn record(&mut self, duration: Duration, outcome: AttemptOutcome) {
        self.attempts += 1;
        match outcome {
            AttemptOutcome::Success => self.successes += 1,
            AttemptOutcome::Error => self.errors += 1,
            AttemptOutcome::EmptyResult => self.empty_results += 1,
        }
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
        self.histogram.record(duration);
    }

    /// Calculate average attempt time.
    pub fn avg_duration(&self) -> Duration {
        if self.attempts == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.attempts as u32
        }
    }

    /// Calculate success rate (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            1.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

impl Default for ProviderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic operation metrics with histogram.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    /// Number of operations.
    pub count: u64,

    /// Total duration.
    pub total_duration: Duration,

    /// Latency distribution.
    pub histogram: Histogram,
}

impl OperationMetrics {
    /// Create new operation metrics.
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    /// Record an operation.
    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.histogram.record(duration);
    }

    /// Calculate average duration.
    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple histogram with fixed buckets for latency tracking.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Bucket boundaries in milliseconds.
    buckets: Vec<u64>,

    /// Count per bucket, plus one overflow bucket.
    counts: Vec<u64>,
}

impl Histogram {
    /// Create a histogram with custom bucket boundaries (in milliseconds).
    pub fn with_buckets(buckets: Vec<u64>) -> Self {
        let counts = vec![0; buckets.len() + 1];
        Self { buckets, counts }
    }

    /// Record a duration value.
    pub fn record(&mut self, duration: Duration) {
        let millis = duration.as_millis() as u64;
        let bucket_idx = self
            .buckets
            .iter()
            .position(|&b| millis <= b)
            .unwrap_or(self.buckets.len());
        self.counts[bucket_idx] += 1;
    }

    /// Get counts for each bucket.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Calculate approximate percentile as the upper bound of its bucket.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut cumulative = 0u64;

        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let millis = match self.buckets.get(i) {
                    Some(bound) => *bound,
                    None => self.buckets.last().copied().unwrap_or(0) * 2,
                };
                return Duration::from_millis(millis);
            }
        }

        Duration::ZERO
    }

    /// Get p50 (median) latency.
    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    /// Get p95 latency.
    pub fn p95(&self) -> Duration {
        self.percentile(95.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // External API latencies: 50ms .. 30s
        Self::with_buckets(vec![50, 250, 1_000, 2_500, 5_000, 10_000, 30_000])
    }
}

/// Hit/miss counters for one cache namespace.
#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    fn load(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Provider metrics by name.
    pub providers: HashMap<String, ProviderMetrics>,

    /// Operation metrics by name.
    pub operations: HashMap<String, OperationMetrics>,

    /// (hits, misses) by cache namespace.
    pub caches: HashMap<String, (u64, u64)>,

    /// Uptime when snapshot was taken.
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Metrics Report ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n\n", self.uptime));

        if !self.providers.is_empty() {
            report.push_str("Providers:\n");
            let mut names: Vec<_> = self.providers.keys().collect();
            names.sort();
            for name in names {
                let metrics = &self.providers[name];
                report.push_str(&format!(
                    "  {}: {} attempts, {:.1}% success, {} empty, avg {:.2?}, p95 {:.2?}\n",
                    name,
                    metrics.attempts,
                    metrics.success_rate() * 100.0,
                    metrics.empty_results,
                    metrics.avg_duration(),
                    metrics.histogram.p95()
                ));
            }
            report.push('\n');
        }

        if !self.caches.is_empty() {
            report.push_str("Caches:\n");
            for (namespace, (hits, misses)) in &self.caches {
                report.push_str(&format!("  {}: {} hits, {} misses\n", namespace, hits, misses));
            }
            report.push('\n');
        }

        if !self.operations.is_empty() {
            report.push_str("Operations:\n");
            for (name, metrics) in &self.operations {
                report.push_str(&format!(
                    "  {}: {} ops, avg {:.2?}\n",
                    name,
                    metrics.count,
                    metrics.avg_duration()
                ));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_metrics() {
        let mut metrics = ProviderMetrics::new();
        metrics.record(Duration::from_millis(100), AttemptOutcome::Success);
        metrics.record(Duration::from_millis(200), AttemptOutcome::Success);
        metrics.record(Duration::from_millis(60), AttemptOutcome::EmptyResult);

        assert_eq!(metrics.attempts, 3);
        assert_eq!(metrics.successes, 2);
        assert_eq!(metrics.empty_results, 1);
        assert_eq!(metrics.errors, 0);
        assert!((metrics.success_rate() - 0.666).abs() < 0.01);
        assert_eq!(metrics.avg_duration(), Duration::from_millis(120));
    }

    #[test]
    fn test_histogram_percentiles() {
        let mut hist = Histogram::default();
        for _ in 0..100 {
            hist.record(Duration::from_millis(700));
        }
        assert_eq!(hist.p50(), Duration::from_millis(1_000));
        assert_eq!(hist.p95(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_histogram_overflow_bucket() {
        let mut hist = Histogram::default();
        hist.record(Duration::from_secs(45));
        assert_eq!(hist.counts().last(), Some(&1));
        assert_eq!(hist.p50(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_cache_counters() {
        let metrics = Metrics::new();
        metrics.record_cache("weather", true);
        metrics.record_cache("weather", false);
        metrics.record_cache("weather", true);

        assert_eq!(metrics.cache_counts("weather"), (2, 1));
        assert_eq!(metrics.cache_counts("embedding"), (0, 0));
    }

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = Metrics::new();
        metrics.record_attempt("gemini", Duration::from_millis(100), AttemptOutcome::Error);
        metrics.record_operation("gateway.weather", Duration::from_millis(5));

        let snapshot = metrics.snapshot();
        assert!(snapshot.providers.contains_key("gemini"));
        assert!(snapshot.format_report().contains("gemini: 1 attempts"));

        metrics.reset();
        assert!(metrics.provider_metrics("gemini").is_none());
        assert!(metrics.operation_metrics("gateway.weather").is_none());
    }
}
