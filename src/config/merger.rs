// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use std::path::PathBuf;

use super::types::{ResolvedConfig, WorkspaceConfig};
use crate::error::ConfigError;
use crate::providers::ProviderKind;
use crate::types::Capability;

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub backoff_base_ms: Option<u64>,
    pub probe_timeout_ms: Option<u64>,
    pub cache_path: Option<PathBuf>,
    /// Memory-only caching for this run
    pub no_durable_cache: Option<bool>,
    /// Provider names to disable for this run
    pub disable: Vec<String>,
    pub system_prompt: Option<String>,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge multiple configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Local config (.krishi.local.json)
/// 3. Workspace config (.krishi.json)
/// 4. Global config (~/.krishi/config.json)
/// 5. Default values
///
/// Provider names in `providers` maps and `--disable` accept aliases and are
/// stored under the canonical name. An unknown name is an error.
pub fn merge_config(
    global: Option<WorkspaceConfig>,
    workspace: Option<WorkspaceConfig>,
    local: Option<WorkspaceConfig>,
    cli: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let mut result = default_config();

    for config in [global, workspace, local].into_iter().flatten() {
        apply_workspace_config(&mut result, &config)?;
    }

    // Apply CLI options (highest precedence)
    apply_cli_options(&mut result, &cli)?;

    Ok(result)
}

/// Resolve a provider name or alias to its canonical name.
fn canonical_provider(field: &str, name: &str) -> Result<String, ConfigError> {
    name.parse::<ProviderKind>()
        .map(|kind| kind.name().to_string())
        .map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("unknown provider '{}' (known: {})", name, known_providers()),
        })
}

fn known_providers() -> String {
    Capability::ALL
        .iter()
        .map(|cap| {
            let names: Vec<&str> = ProviderKind::for_capability(*cap).map(|k| k.name()).collect();
            format!("{} for {}", names.join(", "), cap)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn apply_workspace_config(
    result: &mut ResolvedConfig,
    config: &WorkspaceConfig,
) -> Result<(), ConfigError> {
    if let Some(ref backoff) = config.backoff {
        if let Some(base) = backoff.base_ms {
            result.backoff_base_ms = base;
        }
        if let Some(cap) = backoff.cap_ms {
            result.backoff_cap_ms = cap;
        }
    }

    if let Some(ref cache) = config.cache {
        if let Some(ttl) = cache.weather_ttl_ms {
            result.weather_cache_ttl_ms = ttl;
        }
        if let Some(capacity) = cache.weather_capacity {
            result.weather_cache_capacity = capacity;
        }
        if let Some(ttl) = cache.embedding_ttl_ms {
            result.embedding_cache_ttl_ms = ttl;
        }
        if let Some(capacity) = cache.embedding_capacity {
            result.embedding_cache_capacity = capacity;
        }
        if let Some(durable) = cache.durable {
            result.durable_cache = durable;
        }
        if let Some(ref path) = cache.path {
            result.cache_path = Some(expand_home(path));
        }
    }

    if let Some(ref health) = config.health {
        if let Some(timeout) = health.probe_timeout_ms {
            result.probe_timeout_ms = timeout;
        }
        if let Some(age) = health.max_status_age_ms {
            result.max_status_age_ms = age;
        }
        if health.check_interval_ms.is_some() {
            result.health_check_interval_ms = health.check_interval_ms;
        }
    }

    if let Some(ref providers) = config.providers {
        // Merge per field so a local file can tweak one setting
        for (name, overrides) in providers {
            let name = canonical_provider("providers", name)?;
            result.providers.entry(name).or_default().merge(overrides);
        }
    }

    if config.system_prompt.is_some() {
        result.system_prompt = config.system_prompt.clone();
    }

    Ok(())
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) -> Result<(), ConfigError> {
    if let Some(base) = cli.backoff_base_ms {
        result.backoff_base_ms = base;
    }

    if let Some(timeout) = cli.probe_timeout_ms {
        result.probe_timeout_ms = timeout;
    }

    if cli.cache_path.is_some() {
        result.cache_path = cli.cache_path.clone();
    }

    if cli.no_durable_cache == Some(true) {
        result.durable_cache = false;
    }

    for name in &cli.disable {
        let name = canonical_provider("disable", name)?;
        result.providers.entry(name).or_default().disabled = Some(true);
    }

    if cli.system_prompt.is_some() {
        result.system_prompt = cli.system_prompt.clone();
    }

    Ok(())
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
