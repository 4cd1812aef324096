// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Span helpers for failover walks and provider attempts.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info_span, Span};

use super::correlation::{CorrelationId, CorrelationIdExt};
use crate::types::{AttemptOutcome, AttemptRecord, Capability};

/// Span covering one failover walk over a capability's providers.
pub fn failover_span(capability: Capability, correlation_id: &CorrelationId) -> Span {
    let span = info_span!(
        "failover",
        capability = %capability,
        correlation_id = tracing::field::Empty,
        provider = tracing::field::Empty,
        attempts = tracing::field::Empty,
    );
    span.record_correlation_id(correlation_id);
    span
}

/// RAII guard timing a single provider attempt.
///
/// Finishing the span yields the [`AttemptRecord`] for the walk and, with
/// the `telemetry` feature, records the attempt to the global metrics.
pub struct AttemptSpan {
    provider: String,
    started_at: DateTime<Utc>,
    start: Instant,
    span: Span,
}

impl AttemptSpan {
    /// Start timing an attempt against `provider`.
    pub fn start(provider: &str) -> Self {
        let span = info_span!(
            "attempt",
            provider = %provider,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        Self {
            provider: provider.to_string(),
            started_at: Utc::now(),
            start: Instant::now(),
            span,
        }
    }

    /// Get the underlying tracing span.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Close the attempt with its outcome.
    pub fn finish(self, outcome: AttemptOutcome, error_message: Option<String>) -> AttemptRecord {
        let duration = self.start.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

        self.span.record("duration_ms", duration_ms);
        self.span.record("outcome", outcome.to_string().as_str());

        #[cfg(feature = "telemetry")]
        super::metrics::GLOBAL_METRICS.record_attempt(&self.provider, duration, outcome);

        AttemptRecord {
            provider_name: self.provider,
            started_at: self.started_at,
            duration_ms,
            outcome,
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_span_builds_record() {
        let span = AttemptSpan::start("open-meteo");
        let record = span.finish(AttemptOutcome::EmptyResult, Some("no data".to_string()));

        assert_eq!(record.provider_name, "open-meteo");
        assert_eq!(record.outcome, AttemptOutcome::EmptyResult);
        assert_eq!(record.error_message.as_deref(), Some("no data"));
        assert!(!record.succeeded());
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn test_attempt_span_records_metrics() {
        let span = AttemptSpan::start("span-metrics-test-provider");
        span.finish(AttemptOutcome::Success, None);

        let metrics = super::super::metrics::GLOBAL_METRICS
            .provider_metrics("span-metrics-test-provider")
            .unwrap();
        assert!(metrics.successes >= 1);
    }
}
