// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Provider adapters for every external backend.
//!
//! Each adapter implements [`Backend`] plus one capability trait:
//!
//! | Capability | Providers (default priority order) |
//! |------------|------------------------------------|
//! | generate   | gemini, groq, anthropic            |
//! | weather    | openweathermap, weatherapi, open-meteo |
//! | embed      | openai-embeddings, ollama          |
//!
//! # Quick Start
//!
//! Set whichever keys you have; providers without a usable key are simply
//! skipped during failover.
//!
//! ```bash
//! export GEMINI_API_KEY=AIza...
//! export GROQ_API_KEY=gsk_...
//! export OPENWEATHER_API_KEY=...
//! ```
//!
//! ```rust,ignore
//! use krishi::config::Credentials;
//! use krishi::providers::{create_provider, ProviderKind, ProviderSettings};
//!
//! let credentials = Credentials::from_env();
//! let gemini = create_provider(ProviderKind::Gemini, &credentials, ProviderSettings::default());
//! ```

pub mod base;
pub mod credentials;
pub mod embedding;
pub mod generation;
pub mod weather;

pub use base::{Backend, EmbeddingProvider, GenerationProvider, ProviderSettings, WeatherProvider};
pub use embedding::{OllamaEmbeddingProvider, OpenAIEmbeddingProvider};
pub use generation::{AnthropicProvider, GeminiProvider, OpenAICompatibleProvider};
pub use weather::{OpenMeteoProvider, OpenWeatherProvider, WeatherApiProvider};

use std::sync::Arc;

use crate::config::Credentials;
use crate::failover::RegisteredProvider;
use crate::types::Capability;

/// Every provider this crate ships an adapter for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    Groq,
    Anthropic,
    OpenWeather,
    WeatherApi,
    OpenMeteo,
    OpenAIEmbeddings,
    Ollama,
}

impl ProviderKind {
    /// All kinds, in registration order.
    pub const ALL: [ProviderKind; 8] = [
        Self::Gemini,
        Self::Groq,
        Self::Anthropic,
        Self::OpenWeather,
        Self::WeatherApi,
        Self::OpenMeteo,
        Self::OpenAIEmbeddings,
        Self::Ollama,
    ];

    /// Registry name; also the key under `providers` in config files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gemini => GeminiProvider::NAME,
            Self::Groq => generation::GROQ.name,
            Self::Anthropic => AnthropicProvider::NAME,
            Self::OpenWeather => OpenWeatherProvider::NAME,
            Self::WeatherApi => WeatherApiProvider::NAME,
            Self::OpenMeteo => OpenMeteoProvider::NAME,
            Self::OpenAIEmbeddings => OpenAIEmbeddingProvider::NAME,
            Self::Ollama => OllamaEmbeddingProvider::NAME,
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Gemini | Self::Groq | Self::Anthropic => Capability::Generate,
            Self::OpenWeather | Self::WeatherApi | Self::OpenMeteo => Capability::Weather,
            Self::OpenAIEmbeddings | Self::Ollama => Capability::Embed,
        }
    }

    /// Environment variable holding the credential, if any.
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Groq => Some(generation::GROQ.key_env),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenWeather => Some("OPENWEATHER_API_KEY"),
            Self::WeatherApi => Some("WEATHERAPI_KEY"),
            Self::OpenMeteo => None,
            Self::OpenAIEmbeddings => Some("OPENAI_API_KEY"),
            Self::Ollama => Some("OLLAMA_BASE_URL"),
        }
    }

    /// Kinds serving one capability.
    pub fn for_capability(capability: Capability) -> impl Iterator<Item = ProviderKind> {
        Self::ALL.into_iter().filter(move |k| k.capability() == capability)
    }
}

/// Error type for parsing a provider kind from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProviderKindError;

impl std::fmt::Display for ParseProviderKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown provider")
    }
}

impl std::error::Error for ParseProviderKindError {}

impl std::str::FromStr for ProviderKind {
    type Err = ParseProviderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openweathermap" | "openweather" | "owm" => Ok(Self::OpenWeather),
            "weatherapi" => Ok(Self::WeatherApi),
            "open-meteo" | "openmeteo" => Ok(Self::OpenMeteo),
            "openai-embeddings" | "openai" => Ok(Self::OpenAIEmbeddings),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ParseProviderKindError),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Create a provider adapter from its kind, credentials and settings.
///
/// Never fails: a missing credential yields an adapter whose
/// `is_available()` is false.
pub fn create_provider(
    kind: ProviderKind,
    credentials: &Credentials,
    settings: ProviderSettings,
) -> RegisteredProvider {
    let key = credentials.get(kind).map(str::to_string);
    match kind {
        ProviderKind::Gemini => {
            let p: Arc<dyn GenerationProvider> = Arc::new(GeminiProvider::new(key, settings));
            p.into()
        }
        ProviderKind::Groq => {
            let p: Arc<dyn GenerationProvider> = Arc::new(OpenAICompatibleProvider::groq(key, settings));
            p.into()
        }
        ProviderKind::Anthropic => {
            let p: Arc<dyn GenerationProvider> = Arc::new(AnthropicProvider::new(key, settings));
            p.into()
        }
        ProviderKind::OpenWeather => {
            let p: Arc<dyn WeatherProvider> = Arc::new(OpenWeatherProvider::new(key, settings));
            p.into()
        }
        ProviderKind::WeatherApi => {
            let p: Arc<dyn WeatherProvider> = Arc::new(WeatherApiProvider::new(key, settings));
            p.into()
        }
        ProviderKind::OpenMeteo => {
            let p: Arc<dyn WeatherProvider> = Arc::new(OpenMeteoProvider::new(settings));
            p.into()
        }
        ProviderKind::OpenAIEmbeddings => {
            let p: Arc<dyn EmbeddingProvider> = Arc::new(OpenAIEmbeddingProvider::new(key, settings));
            p.into()
        }
        ProviderKind::Ollama => {
            let p: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbeddingProvider::new(key, settings));
            p.into()
        }
    }
}
