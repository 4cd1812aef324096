// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Provider Registry: the fixed, ordered set of adapters built at startup.
//!
//! Providers are registered once and never mutated. Resolution filters by
//! capability and availability and sorts by ascending priority; ties keep
//! registration order.

use std::sync::Arc;

use tracing::debug;

use crate::error::RegistryError;
use crate::providers::{Backend, EmbeddingProvider, GenerationProvider, WeatherProvider};
use crate::types::Capability;

// ============================================================================
// Registered Provider
// ============================================================================

/// A provider adapter tagged with its capability.
#[derive(Clone)]
pub enum RegisteredProvider {
    Generation(Arc<dyn GenerationProvider>),
    Weather(Arc<dyn WeatherProvider>),
    Embedding(Arc<dyn EmbeddingProvider>),
}

impl RegisteredProvider {
    /// Capability derived from the variant.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Generation(_) => Capability::Generate,
            Self::Weather(_) => Capability::Weather,
            Self::Embedding(_) => Capability::Embed,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Generation(p) => p.name(),
            Self::Weather(p) => p.name(),
            Self::Embedding(p) => p.name(),
        }
    }

    pub fn priority(&self) -> u32 {
        match self {
            Self::Generation(p) => p.priority(),
            Self::Weather(p) => p.priority(),
            Self::Embedding(p) => p.priority(),
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Self::Generation(p) => p.is_available(),
            Self::Weather(p) => p.is_available(),
            Self::Embedding(p) => p.is_available(),
        }
    }
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("name", &self.name())
            .field("capability", &self.capability())
            .field("priority", &self.priority())
            .finish()
    }
}

impl From<Arc<dyn GenerationProvider>> for RegisteredProvider {
    fn from(provider: Arc<dyn GenerationProvider>) -> Self {
        Self::Generation(provider)
    }
}

impl From<Arc<dyn WeatherProvider>> for RegisteredProvider {
    fn from(provider: Arc<dyn WeatherProvider>) -> Self {
        Self::Weather(provider)
    }
}

impl From<Arc<dyn EmbeddingProvider>> for RegisteredProvider {
    fn from(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::Embedding(provider)
    }
}

// ============================================================================
// Typed resolution
// ============================================================================

/// Links a capability trait object type to its registry variant.
///
/// Implemented for `dyn GenerationProvider`, `dyn WeatherProvider` and
/// `dyn EmbeddingProvider`, so the orchestrator can resolve a typed provider
/// list with `registry.available::<dyn WeatherProvider>()`.
pub trait CapabilityKind: Backend {
    /// Capability served by this provider type.
    const CAPABILITY: Capability;

    /// Extract a typed handle from a registry entry of the matching variant.
    fn extract(provider: &RegisteredProvider) -> Option<Arc<Self>>;
}

impl CapabilityKind for dyn GenerationProvider {
    const CAPABILITY: Capability = Capability::Generate;

    fn extract(provider: &RegisteredProvider) -> Option<Arc<Self>> {
        match provider {
            RegisteredProvider::Generation(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl CapabilityKind for dyn WeatherProvider {
    const CAPABILITY: Capability = Capability::Weather;

    fn extract(provider: &RegisteredProvider) -> Option<Arc<Self>> {
        match provider {
            RegisteredProvider::Weather(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl CapabilityKind for dyn EmbeddingProvider {
    const CAPABILITY: Capability = Capability::Embed;

    fn extract(provider: &RegisteredProvider) -> Option<Arc<Self>> {
        match provider {
            RegisteredProvider::Embedding(p) => Some(p.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// Provider Registry
// ============================================================================

/// Ordered registry of provider adapters.
///
/// # Example
///
/// ```rust,ignore
/// use krishi::failover::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// registry.register(gemini)?;
/// registry.register(groq)?;
///
/// let providers = registry.available::<dyn GenerationProvider>();
/// ```
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Names must be unique across all capabilities.
    pub fn register(&mut self, provider: impl Into<RegisteredProvider>) -> Result<(), RegistryError> {
        let provider = provider.into();
        if self.providers.iter().any(|p| p.name() == provider.name()) {
            return Err(RegistryError::DuplicateProvider(provider.name().to_string()));
        }
        debug!(
            provider = provider.name(),
            capability = %provider.capability(),
            priority = provider.priority(),
            "Registered provider"
        );
        self.providers.push(provider);
        Ok(())
    }

    /// Providers for a capability that report themselves available, in
    /// ascending priority. Never fails; an empty list is the caller's problem.
    pub fn available_providers(&self, capability: Capability) -> Vec<RegisteredProvider> {
        let providers: Vec<RegisteredProvider> = self
            .all(capability)
            .into_iter()
            .filter(RegisteredProvider::is_available)
            .collect();

        let names: Vec<&str> = providers.iter().map(RegisteredProvider::name).collect();
        debug!(capability = %capability, available = ?names, "Resolved providers");

        providers
    }

    /// Typed variant of [`available_providers`](Self::available_providers).
    pub fn available<P: CapabilityKind + ?Sized>(&self) -> Vec<Arc<P>> {
        self.available_providers(P::CAPABILITY)
            .iter()
            .filter_map(P::extract)
            .collect()
    }

    /// Every provider registered for a capability, available or not, in
    /// priority order.
    pub fn all(&self, capability: Capability) -> Vec<RegisteredProvider> {
        let mut providers: Vec<RegisteredProvider> = self
            .providers
            .iter()
            .filter(|p| p.capability() == capability)
            .cloned()
            .collect();
        providers.sort_by_key(RegisteredProvider::priority);
        providers
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredProvider> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Number of registered providers across all capabilities.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
