// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry, tracing, and metrics infrastructure.
//!
//! - **Tracing**: structured logs, with one span per failover walk and one
//!   per provider attempt
//! - **Metrics**: per-provider attempt counts, success rates and latency
//!   histograms, plus cache hit/miss counters
//! - **Correlation IDs**: tie the attempts of one gateway call together
//!
//! # Usage
//!
//! ```rust,ignore
//! use krishi::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::for_verbosity(1))?;
//! ```
//!
//! Provider secrets must never be recorded as span fields.

mod correlation;
mod init;
pub mod metrics;
mod spans;

pub use correlation::{CorrelationId, CorrelationIdExt};
pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{
    Histogram, Metrics, MetricsSnapshot, OperationMetrics, ProviderMetrics, GLOBAL_METRICS,
};
pub use spans::{failover_span, AttemptSpan};
