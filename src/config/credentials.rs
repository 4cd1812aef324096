// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Provider credentials, read only from the environment.
//!
//! Keys are never written to config files. `Debug` output is redacted.

use std::collections::HashMap;

use crate::providers::credentials::redact;
use crate::providers::ProviderKind;

/// Credential values keyed by provider kind.
#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<ProviderKind, String>,
}

impl Credentials {
    /// Read every provider's environment variable.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = ProviderKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let var = kind.env_var()?;
                let value = lookup(var)?;
                let value = value.trim();
                (!value.is_empty()).then(|| (kind, value.to_string()))
            })
            .collect();
        Self { values }
    }

    /// Set one credential.
    pub fn with(mut self, kind: ProviderKind, value: impl Into<String>) -> Self {
        self.values.insert(kind, value.into());
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&str> {
        self.values.get(&kind).map(String::as_str)
    }

    /// Kinds with some value set, in registration order. Says nothing about validity.
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.values.contains_key(k))
            .collect()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in self.configured() {
            if let Some(value) = self.values.get(&kind) {
                // Ollama's "credential" is a URL, not a secret
                let shown = if kind == ProviderKind::Ollama {
                    value.clone()
                } else {
                    redact(value)
                };
                map.entry(&kind.name(), &shown);
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let creds = Credentials::from_lookup(lookup(&[
            ("GEMINI_API_KEY", " AIzaSyA1b2C3d4E5f6G7h8 "),
            ("WEATHERAPI_KEY", ""),
            ("OLLAMA_BASE_URL", "http://localhost:11434"),
        ]));

        assert_eq!(creds.get(ProviderKind::Gemini), Some("AIzaSyA1b2C3d4E5f6G7h8"));
        assert_eq!(creds.get(ProviderKind::WeatherApi), None);
        assert_eq!(creds.get(ProviderKind::OpenMeteo), None);
        assert_eq!(
            creds.configured(),
            vec![ProviderKind::Gemini, ProviderKind::Ollama]
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let creds = Credentials::default()
            .with(ProviderKind::Groq, "gsk_supersecretvalue")
            .with(ProviderKind::Ollama, "http://gpu-box:11434");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("gsk_****"));
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("http://gpu-box:11434"));
    }
}
