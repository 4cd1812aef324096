// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Krishi - resilient provider access for an agricultural advice assistant.
//!
//! Every external dependency of the assistant (text generation, weather and
//! embeddings) is reached through a gateway that walks an ordered list of
//! providers, skipping unhealthy ones and falling through on errors or
//! unusable output. Weather readings and embeddings are cached in a bounded
//! memory tier backed by an optional SQLite store.
//!
//! # Architecture
//!
//! - [`types`] - Capabilities, attempt records and the values gateways return
//! - [`error`] - Error types and result aliases
//! - [`config`] - Layered configuration and credentials
//! - [`cache`] - Two-tier cache store and the embedding cache
//! - [`failover`] - Backoff, health monitor, provider registry and the orchestrator
//! - [`providers`] - Generation, weather and embedding adapters
//! - [`gateway`] - Caller-facing weather, generation and embedding gateways
//! - [`services`] - Startup wiring of all of the above
//! - [`telemetry`] - Tracing and metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use krishi::config::{load_config, CliOptions, Credentials};
//! use krishi::services::Services;
//!
//! let config = load_config(".", CliOptions::default())?;
//! let services = Services::from_config(&config, &Credentials::from_env())?;
//!
//! let reading = services.weather.get_weather("Pune").await?;
//! println!("{}: {}", reading.location, reading.advisory_text);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod failover;
pub mod gateway;
pub mod providers;
pub mod services;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{CacheError, ConfigError, GatewayError, ProviderError, RegistryError, Result};
pub use failover::{BackoffPolicy, FailoverOrchestrator, HealthMonitor, ProviderRegistry};
pub use gateway::{EmbeddingGateway, GenerationGateway, WeatherGateway};
pub use services::Services;
pub use types::{
    AttemptOutcome, AttemptRecord, Capability, EmbeddingVector, Embeddings, Generation,
    WeatherReading,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
