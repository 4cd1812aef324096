// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Provider selection: registry, health, backoff and the failover walk.

pub mod backoff;
pub mod health;
pub mod orchestrator;
pub mod output;
pub mod registry;

pub use backoff::BackoffPolicy;
pub use health::{HealthMonitor, HealthSettings, HealthStatus};
pub use orchestrator::{Execution, FailoverOrchestrator};
pub use output::{ProviderOutput, Rejection};
pub use registry::{CapabilityKind, ProviderRegistry, RegisteredProvider};
