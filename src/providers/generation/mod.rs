// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Text generation backends, in default failover order:
//!
//! - [`gemini::GeminiProvider`] (`GEMINI_API_KEY`)
//! - [`openai::OpenAICompatibleProvider`] for Groq (`GROQ_API_KEY`)
//! - [`anthropic::AnthropicProvider`] (`ANTHROPIC_API_KEY`)

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::{CompatibleProfile, OpenAICompatibleProvider, GROQ};
