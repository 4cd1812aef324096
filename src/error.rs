// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the krishi provider access layer.
//!
//! This module provides strongly-typed errors for different parts of the crate,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error
//! propagation at the binary edge.

use std::fmt;

use thiserror::Error;

use crate::types::{AttemptOutcome, Capability};

/// Errors that a single provider adapter can produce.
///
/// These never reach gateway callers directly: the failover orchestrator turns
/// them into [`ProviderFailure`] records and moves on to the next provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response parsing error: {0}")]
    ParseError(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider unhealthy: {0}")]
    Unhealthy(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The HTTP client gave up waiting for a response.
    #[error("Request timed out")]
    RequestTimeout,
}

impl ProviderError {
    /// Create an API error with status code.
    pub fn api(message: impl Into<String>, status_code: u16) -> Self {
        Self::ApiError {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Map an HTTP error status and body to a provider error.
    pub fn from_status(status_code: u16, body: &str) -> Self {
        match status_code {
            401 | 403 => Self::AuthError(body.to_string()),
            429 => Self::RateLimited(body.to_string()),
            _ => Self::api(body.to_string(), status_code),
        }
    }
}

/// Weather keys travel in the query string, so the URL is stripped before
/// the error text is kept.
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::RequestTimeout
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

/// One provider's failed attempt within a failover walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Name of the provider that failed.
    pub provider: String,
    /// Whether the attempt errored or returned an empty result.
    pub outcome: AttemptOutcome,
    /// Last error message for this provider.
    pub reason: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.provider, self.outcome, self.reason)
    }
}

/// Errors surfaced by the gateways to their callers.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No providers available for capability '{capability}'")]
    NoProvidersAvailable { capability: Capability },

    #[error("All {} providers failed for capability '{capability}': {}", .failures.len(), join_failures(.failures))]
    AllProvidersFailed {
        capability: Capability,
        failures: Vec<ProviderFailure>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GatewayError {
    /// Per-provider failure reasons, in registry order. Empty unless every
    /// provider failed.
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::AllProvidersFailed { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Check if this error means the caller should fall back to its own
    /// placeholder value or message.
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            Self::NoProvidersAvailable { .. } | Self::AllProvidersFailed { .. }
        )
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by the provider registry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Provider already registered: {0}")]
    DuplicateProvider(String),
}

/// Errors from the durable cache tier.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache store: {0}")]
    OpenFailed(String),

    #[error("Cache read failed: {0}")]
    ReadFailed(String),

    #[error("Cache write failed: {0}")]
    WriteFailed(String),

    #[error("Cache entry could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        Self::ReadFailed(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        assert_eq!(ProviderError::Timeout(5000).to_string(), "Timeout after 5000ms");
        assert_eq!(ProviderError::RequestTimeout.to_string(), "Request timed out");
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            ProviderError::from_status(401, "nope"),
            ProviderError::AuthError(_)
        ));
        assert!(matches!(
            ProviderError::from_status(429, "slow down"),
            ProviderError::RateLimited(_)
        ));
        match ProviderError::from_status(503, "down") {
            ProviderError::ApiError { status_code, .. } => assert_eq!(status_code, Some(503)),
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_all_providers_failed_display() {
        let err = GatewayError::AllProvidersFailed {
            capability: Capability::Generate,
            failures: vec![
                ProviderFailure {
                    provider: "gemini".to_string(),
                    outcome: AttemptOutcome::Error,
                    reason: "Rate limited: quota".to_string(),
                },
                ProviderFailure {
                    provider: "groq".to_string(),
                    outcome: AttemptOutcome::EmptyResult,
                    reason: "Empty response from groq".to_string(),
                },
            ],
        };
        let display = err.to_string();
        assert!(display.contains("All 2 providers failed"));
        assert!(display.contains("gemini (error): Rate limited: quota"));
        assert!(display.contains("groq (empty_result)"));
        assert_eq!(err.failures().len(), 2);
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_invalid_input_is_not_exhausted() {
        let err = GatewayError::InvalidInput("empty location".to_string());
        assert!(!err.is_exhausted());
        assert!(err.failures().is_empty());
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }
}
