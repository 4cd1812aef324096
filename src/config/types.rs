// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the structure of workspace and resolved configuration,
//! supporting JSON and YAML formats.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheSettings;
use crate::failover::{BackoffPolicy, HealthSettings};
use crate::providers::ProviderSettings;

/// Workspace configuration for krishi.
/// Can be defined in .krishi.json or .krishi/config.json in the project root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Delay between failover attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffConfig>,

    /// Weather and embedding cache settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Health probe settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthConfig>,

    /// Per-provider overrides, keyed by provider name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<HashMap<String, ProviderConfig>>,

    /// Default system prompt for `ask`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Backoff settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackoffConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_ms: Option<u64>,
}

/// Cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_ttl_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_ttl_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_capacity: Option<usize>,
    /// Persist entries in SQLite behind the memory tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durable: Option<bool>,
    /// SQLite file (default: ~/.krishi/cache.db)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Health monitor settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_timeout_ms: Option<u64>,
    /// 0 probes on every check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_status_age_ms: Option<u64>,
    /// Background re-probe interval; unset disables the background task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval_ms: Option<u64>,
}

/// Overrides for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl ProviderConfig {
    /// Overlay `other` onto `self`, field by field.
    pub fn merge(&mut self, other: &ProviderConfig) {
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.model.is_some() {
            self.model = other.model.clone();
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url.clone();
        }
        if other.timeout_ms.is_some() {
            self.timeout_ms = other.timeout_ms;
        }
        if other.disabled.is_some() {
            self.disabled = other.disabled;
        }
    }
}

/// Resolved configuration with all values set.
/// This is the merged result of global, workspace, local, and CLI configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub weather_cache_ttl_ms: u64,
    pub weather_cache_capacity: usize,
    pub embedding_cache_ttl_ms: u64,
    pub embedding_cache_capacity: usize,
    pub durable_cache: bool,
    pub cache_path: Option<PathBuf>,
    pub probe_timeout_ms: u64,
    pub max_status_age_ms: u64,
    pub health_check_interval_ms: Option<u64>,
    pub providers: HashMap<String, ProviderConfig>,
    pub system_prompt: Option<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 1000,
            backoff_cap_ms: 5000,
            weather_cache_ttl_ms: 10 * 60 * 1000,
            weather_cache_capacity: 500,
            embedding_cache_ttl_ms: 7 * 24 * 60 * 60 * 1000,
            embedding_cache_capacity: 10_000,
            durable_cache: true,
            cache_path: None,
            probe_timeout_ms: 5000,
            max_status_age_ms: 30_000,
            health_check_interval_ms: None,
            providers: HashMap::new(),
            system_prompt: None,
        }
    }
}

impl ResolvedConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_cap_ms),
        )
    }

    pub fn health_settings(&self) -> HealthSettings {
        HealthSettings {
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            max_status_age: Duration::from_millis(self.max_status_age_ms),
            ..HealthSettings::default()
        }
    }

    pub fn weather_cache_settings(&self) -> CacheSettings {
        CacheSettings::new(
            Duration::from_millis(self.weather_cache_ttl_ms),
            self.weather_cache_capacity,
        )
    }

    pub fn embedding_cache_settings(&self) -> CacheSettings {
        CacheSettings::new(
            Duration::from_millis(self.embedding_cache_ttl_ms),
            self.embedding_cache_capacity,
        )
    }

    /// Adapter settings for a provider; unconfigured providers get defaults.
    pub fn provider_settings(&self, name: &str) -> ProviderSettings {
        match self.providers.get(name) {
            Some(config) => ProviderSettings {
                priority: config.priority,
                model: config.model.clone(),
                base_url: config.base_url.clone(),
                timeout_ms: config.timeout_ms,
                disabled: config.disabled.unwrap_or(false),
            },
            None => ProviderSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_config_default() {
        let config = WorkspaceConfig::default();
        assert!(config.backoff.is_none());
        assert!(config.providers.is_none());
    }

    #[test]
    fn test_workspace_config_json_serialization() {
        let config: WorkspaceConfig = serde_json::from_str(
            r#"{
                "backoff": {"baseMs": 250, "capMs": 2000},
                "cache": {"weatherTtlMs": 60000, "durable": false},
                "providers": {"groq": {"priority": 0, "model": "llama-3.3-70b-versatile"}}
            }"#,
        )
        .unwrap();

        assert_eq!(config.backoff.as_ref().unwrap().base_ms, Some(250));
        assert_eq!(config.cache.as_ref().unwrap().durable, Some(false));
        let groq = &config.providers.as_ref().unwrap()["groq"];
        assert_eq!(groq.priority, Some(0));

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("weatherTtlMs"));
        assert!(!json.contains("health"));
    }

    #[test]
    fn test_workspace_config_yaml_serialization() {
        let yaml = "health:\n  probeTimeoutMs: 2000\n  maxStatusAgeMs: 0\nproviders:\n  open-meteo:\n    disabled: true\n";
        let config: WorkspaceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.health.as_ref().unwrap().max_status_age_ms, Some(0));
        assert_eq!(config.providers.unwrap()["open-meteo"].disabled, Some(true));
    }

    #[test]
    fn test_resolved_config_default() {
        let config = ResolvedConfig::default();
        assert_eq!(config.backoff().delay(0), Duration::from_millis(1000));
        assert_eq!(config.backoff().delay(5), Duration::from_millis(5000));
        assert_eq!(config.weather_cache_settings().ttl, Duration::from_secs(600));
        assert_eq!(config.health_settings().probe_timeout, Duration::from_millis(5000));
        assert!(config.durable_cache);
    }

    #[test]
    fn test_provider_settings_lookup() {
        let mut config = ResolvedConfig::default();
        config.providers.insert(
            "gemini".to_string(),
            ProviderConfig {
                priority: Some(3),
                disabled: Some(true),
                ..Default::default()
            },
        );

        let settings = config.provider_settings("gemini");
        assert_eq!(settings.priority, Some(3));
        assert!(settings.disabled);

        let defaults = config.provider_settings("groq");
        assert!(defaults.priority.is_none());
        assert!(!defaults.disabled);
    }

    #[test]
    fn test_provider_config_merge() {
        let mut base = ProviderConfig {
            priority: Some(1),
            model: Some("a".to_string()),
            ..Default::default()
        };
        base.merge(&ProviderConfig {
            model: Some("b".to_string()),
            timeout_ms: Some(500),
            ..Default::default()
        });
        assert_eq!(base.priority, Some(1));
        assert_eq!(base.model.as_deref(), Some("b"));
        assert_eq!(base.timeout_ms, Some(500));
    }
}
