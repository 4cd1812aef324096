// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ollama embedding provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::error::ProviderError;
use crate::providers::base::{http_client, Backend, EmbeddingProvider, ProviderSettings};
use crate::types::{Capability, EmbeddingVector};

const DEFAULT_MODEL: &str = "nomic-embed-text";
const DEFAULT_PRIORITY: u32 = 1;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Ollama embedding request.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Ollama embedding response.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Ollama tags response (for model listing).
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// State shared with spawned request tasks.
struct Endpoint {
    client: Client,
    model: String,
    base_url: String,
    dimensions: AtomicUsize,
    /// Semaphore to limit concurrent requests.
    request_semaphore: Semaphore,
}

impl Endpoint {
    /// Make API request for a single embedding.
    async fn request_embedding(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        let start = Instant::now();

        let _permit = self
            .request_semaphore
            .acquire()
            .await
            .map_err(|e| ProviderError::NetworkError(format!("Failed to acquire request permit: {}", e)))?;

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let embedding_response: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

        // Update dimensions if different from expected
        let actual_dimensions = embedding_response.embedding.len();
        if actual_dimensions > 0 && actual_dimensions != self.dimensions.load(Ordering::SeqCst) {
            self.dimensions.store(actual_dimensions, Ordering::SeqCst);
        }

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("ollama.embed_request", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(EmbeddingVector::new(embedding_response.embedding))
    }
}

/// Ollama embedding provider. Available only when a base URL is configured.
pub struct OllamaEmbeddingProvider {
    endpoint: Arc<Endpoint>,
    configured: bool,
    priority: u32,
    disabled: bool,
}

impl OllamaEmbeddingProvider {
    pub const NAME: &'static str = "ollama";

    /// Default embedding dimensions (will be detected on first request).
    const DEFAULT_DIMENSIONS: usize = 768;

    /// Max concurrent requests to Ollama.
    const MAX_CONCURRENT_REQUESTS: usize = 5;

    /// Create a provider for `base_url` (usually `OLLAMA_BASE_URL`).
    pub fn new(base_url: Option<String>, settings: ProviderSettings) -> Self {
        let base_url = base_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let configured = base_url.is_some() || settings.base_url.is_some();
        let base_url = settings
            .base_url
            .clone()
            .or(base_url)
            .unwrap_or_else(|| "http://localhost:11434".to_string())
            .trim_end_matches('/')
            .to_string();
        let model = settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());

        // Known dimensions for common models
        let dimensions = match model.as_str() {
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            "snowflake-arctic-embed" => 1024,
            _ => Self::DEFAULT_DIMENSIONS,
        };

        Self {
            endpoint: Arc::new(Endpoint {
                client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
                model,
                base_url,
                dimensions: AtomicUsize::new(dimensions),
                request_semaphore: Semaphore::new(Self::MAX_CONCURRENT_REQUESTS),
            }),
            configured,
            priority: settings.priority.unwrap_or(DEFAULT_PRIORITY),
            disabled: settings.disabled,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.endpoint.base_url
    }

    /// Check if the model has been pulled.
    async fn check_model_available(&self) -> Result<(), ProviderError> {
        let response = self
            .endpoint
            .client
            .get(format!("{}/api/tags", self.endpoint.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), "tags request failed"));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(ProviderError::from)?;
        if has_model(&tags, &self.endpoint.model) {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(format!(
                "model '{}' not pulled",
                self.endpoint.model
            )))
        }
    }
}

/// Model names may carry a `:latest` style tag.
fn has_model(tags: &TagsResponse, model: &str) -> bool {
    tags.models
        .iter()
        .any(|m| m.name == model || m.name.starts_with(&format!("{}:", model)))
}

impl Backend for OllamaEmbeddingProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capability(&self) -> Capability {
        Capability::Embed
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        !self.disabled && self.configured
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn model(&self) -> &str {
        &self.endpoint.model
    }

    fn dimensions(&self) -> usize {
        self.endpoint.dimensions.load(Ordering::SeqCst)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // One request per text, bounded by the semaphore
        let mut tasks = JoinSet::new();
        for (index, text) in texts.iter().cloned().enumerate() {
            let endpoint = Arc::clone(&self.endpoint);
            tasks.spawn(async move { (index, endpoint.request_embedding(&text).await) });
        }

        let mut results: Vec<Option<EmbeddingVector>> = vec![None; texts.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) =
                joined.map_err(|e| ProviderError::NetworkError(format!("embedding task failed: {}", e)))?;
            // Dropping the set aborts the remaining requests
            results[index] = Some(result?);
        }

        results
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| ProviderError::ParseError(format!("missing embedding at index {}", i)))
            })
            .collect()
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        self.check_model_available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_dimensions() {
        let settings = |model: &str| ProviderSettings::default().with_model(model);

        let nomic = OllamaEmbeddingProvider::new(None, settings("nomic-embed-text"));
        assert_eq!(nomic.dimensions(), 768);

        let mxbai = OllamaEmbeddingProvider::new(None, settings("mxbai-embed-large"));
        assert_eq!(mxbai.dimensions(), 1024);

        let minilm = OllamaEmbeddingProvider::new(None, settings("all-minilm"));
        assert_eq!(minilm.dimensions(), 384);
    }

    #[test]
    fn test_unknown_model_default_dimensions() {
        let unknown = OllamaEmbeddingProvider::new(None, ProviderSettings::default().with_model("unknown-model"));
        assert_eq!(unknown.dimensions(), OllamaEmbeddingProvider::DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_available_only_when_configured() {
        let unset = OllamaEmbeddingProvider::new(None, ProviderSettings::default());
        assert!(!unset.is_available());

        let blank = OllamaEmbeddingProvider::new(Some("  ".into()), ProviderSettings::default());
        assert!(!blank.is_available());

        let set = OllamaEmbeddingProvider::new(Some("http://custom:8080/".into()), ProviderSettings::default());
        assert!(set.is_available());
        assert_eq!(set.base_url(), "http://custom:8080");
        assert_eq!(set.priority(), 1);
    }

    #[test]
    fn test_model_tag_matching() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"nomic-embed-text:latest"},{"name":"llama3.2:3b"}]}"#,
        )
        .unwrap();
        assert!(has_model(&tags, "nomic-embed-text"));
        assert!(!has_model(&tags, "all-minilm"));
    }
}
