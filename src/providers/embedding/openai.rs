// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI embedding provider.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::error::ProviderError;
use crate::providers::base::{http_client, Backend, EmbeddingProvider, ProviderSettings};
use crate::providers::credentials;
use crate::types::{Capability, EmbeddingVector};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_PRIORITY: u32 = 0;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Inputs per request; OpenAI caps a batch well above this, token limits bite first.
const BATCH_SIZE: usize = 100;

/// OpenAI embedding request.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// OpenAI embedding response.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// OpenAI error response.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI embedding provider.
pub struct OpenAIEmbeddingProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    dimensions: usize,
    priority: u32,
    disabled: bool,
}

impl OpenAIEmbeddingProvider {
    pub const NAME: &'static str = "openai-embeddings";

    /// Create a new OpenAI embedding provider.
    pub fn new(api_key: Option<String>, settings: ProviderSettings) -> Self {
        let model = settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let dimensions = match model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 0,
        };

        Self {
            client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
            api_key,
            model,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            dimensions,
            priority: settings.priority.unwrap_or(DEFAULT_PRIORITY),
            disabled: settings.disabled,
        }
    }

    /// Make API request for one batch of embeddings.
    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY not set".to_string()))?;
        let start = Instant::now();

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::from_status(status.as_u16(), &message));
        }

        let embedding_response: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("openai-embeddings.request", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Self::into_vectors(embedding_response, texts.len())
    }

    /// Order vectors by index and check one came back per input.
    fn into_vectors(response: EmbeddingResponse, expected: usize) -> Result<Vec<EmbeddingVector>, ProviderError> {
        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        if data.len() != expected {
            return Err(ProviderError::ParseError(format!(
                "expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }

        Ok(data.into_iter().map(|d| EmbeddingVector::new(d.embedding)).collect())
    }
}

impl Backend for OpenAIEmbeddingProvider {
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
        !self.disabled && credentials::is_usable_with_prefix(self.api_key.as_deref(), "sk-")
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.request_embeddings(chunk).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_by_model() {
        let small = OpenAIEmbeddingProvider::new(Some("sk-test-123456789".into()), ProviderSettings::default());
        assert_eq!(small.dimensions(), 1536);
        assert_eq!(small.model(), "text-embedding-3-small");

        let large = OpenAIEmbeddingProvider::new(
            Some("sk-test-123456789".into()),
            ProviderSettings::default().with_model("text-embedding-3-large"),
        );
        assert_eq!(large.dimensions(), 3072);

        let custom = OpenAIEmbeddingProvider::new(
            Some("sk-test-123456789".into()),
            ProviderSettings::default().with_model("bge-m3"),
        );
        assert_eq!(custom.dimensions(), 0);
    }

    #[test]
    fn test_missing_api_key() {
        let provider = OpenAIEmbeddingProvider::new(None, ProviderSettings::default());
        assert!(!provider.is_available());
        assert_eq!(provider.priority(), 0);
    }

    #[test]
    fn test_vectors_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[0.3,0.4],"index":1},{"embedding":[0.1,0.2],"index":0}],"usage":{"prompt_tokens":4,"total_tokens":4}}"#,
        )
        .unwrap();
        let vectors = OpenAIEmbeddingProvider::into_vectors(response, 2).unwrap();
        assert_eq!(vectors[0].values, vec![0.1, 0.2]);
        assert_eq!(vectors[1].values, vec![0.3, 0.4]);
    }

    #[test]
    fn test_short_batch_is_error() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1],"index":0}]}"#).unwrap();
        assert!(matches!(
            OpenAIEmbeddingProvider::into_vectors(response, 3),
            Err(ProviderError::ParseError(_))
        ));
    }
}
