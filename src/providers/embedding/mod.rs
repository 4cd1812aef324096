// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Embedding backends: OpenAI (`OPENAI_API_KEY`) first, then a local
//! Ollama server (`OLLAMA_BASE_URL`).

pub mod ollama;
pub mod openai;

pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAIEmbeddingProvider;
