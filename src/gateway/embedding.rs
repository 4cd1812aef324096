// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Embedding Gateway: cache-aside embeddings with failover.
//!
//! Cache lookups use the primary provider's model. If failover lands on a
//! provider with a different model, that provider embeds the whole batch so
//! a result never mixes vectors from two models.

use std::sync::Arc;

use tracing::debug;

use crate::cache::EmbeddingCache;
use crate::error::{GatewayError, ProviderError};
use crate::failover::{FailoverOrchestrator, ProviderOutput, Rejection};
use crate::providers::EmbeddingProvider;
use crate::types::{Capability, EmbeddingVector, Embeddings};

#[derive(Debug, Clone)]
pub struct EmbeddingGateway {
    orchestrator: FailoverOrchestrator,
    cache: Arc<EmbeddingCache>,
}

impl EmbeddingGateway {
    pub fn new(orchestrator: FailoverOrchestrator, cache: Arc<EmbeddingCache>) -> Self {
        Self {
            orchestrator,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// One vector per text, in input order.
    pub async fn embed(&self, texts: &[String]) -> Result<Embeddings, GatewayError> {
        if texts.is_empty() {
            return Err(GatewayError::InvalidInput("no texts to embed".to_string()));
        }

        let providers = self.orchestrator.registry().available::<dyn EmbeddingProvider>();
        let primary_model = match providers.first() {
            Some(p) => p.model().to_string(),
            None => {
                return Err(GatewayError::NoProvidersAvailable {
                    capability: Capability::Embed,
                })
            }
        };

        let cached = self.cache.batch_get(texts, &primary_model);
        let (miss_indices, miss_texts): (Vec<usize>, Vec<String>) = cached
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(i, _)| (i, texts[i].clone()))
            .unzip();
        let cache_hits = texts.len() - miss_indices.len();

        if miss_texts.is_empty() {
            debug!(count = texts.len(), model = %primary_model, "All embeddings served from cache");
            return Ok(Embeddings {
                vectors: cached.into_iter().flatten().collect(),
                model: primary_model,
                provider_name: None,
                cache_hits,
            });
        }

        let all_texts: Arc<[String]> = texts.into();
        let miss_batch: Arc<[String]> = miss_texts.into();
        let execution = self
            .orchestrator
            .execute_over(Capability::Embed, providers, |provider| {
                let batch = if provider.model() == primary_model {
                    Arc::clone(&miss_batch)
                } else {
                    Arc::clone(&all_texts)
                };
                async move {
                    let vectors = provider.embed(&batch).await?;
                    if vectors.len() != batch.len() {
                        return Err(ProviderError::ParseError(format!(
                            "expected {} vectors, got {}",
                            batch.len(),
                            vectors.len()
                        )));
                    }
                    // Read after the call: Ollama learns its width from the first response
                    let expected = provider.dimensions();
                    if let Some(bad) = vectors.iter().find(|v| expected > 0 && v.dimensions != expected) {
                        return Err(ProviderError::ParseError(format!(
                            "{} returned {}-dimensional vectors, expected {}",
                            provider.model(),
                            bad.dimensions,
                            expected
                        )));
                    }
                    Ok(EmbeddedBatch {
                        model: provider.model().to_string(),
                        vectors,
                    })
                }
            })
            .await?;

        let provider_name = execution.provider_name;
        let EmbeddedBatch { model, vectors } = execution.value;

        if model == primary_model {
            self.cache.batch_set(&miss_batch, &model, &vectors);

            let mut merged = cached;
            for (index, vector) in miss_indices.into_iter().zip(vectors) {
                merged[index] = Some(vector);
            }
            Ok(Embeddings {
                vectors: merged.into_iter().flatten().collect(),
                model,
                provider_name: Some(provider_name),
                cache_hits,
            })
        } else {
            debug!(primary = %primary_model, fallback = %model, "Embedded whole batch with fallback model");
            self.cache.batch_set(&all_texts, &model, &vectors);
            Ok(Embeddings {
                vectors,
                model,
                provider_name: Some(provider_name),
                cache_hits: 0,
            })
        }
    }
}

/// Vectors tagged with the model that produced them.
struct EmbeddedBatch {
    model: String,
    vectors: Vec<EmbeddingVector>,
}

impl ProviderOutput for EmbeddedBatch {
    fn check(&self) -> Result<(), Rejection> {
        self.vectors.check()
    }
}
