// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI-compatible chat-completions provider.
//!
//! Works with any backend speaking the Chat Completions API. Groq is the
//! configured instance; other vendors only need a [`CompatibleProfile`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::error::ProviderError;
use crate::providers::base::{http_client, Backend, GenerationProvider, ProviderSettings};
use crate::providers::credentials;
use crate::types::{Capability, GenerationRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Vendor-specific defaults for an OpenAI-compatible backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibleProfile {
    pub name: &'static str,
    pub base_url: &'static str,
    pub model: &'static str,
    pub priority: u32,
    /// Environment variable holding the key, for error messages.
    pub key_env: &'static str,
    /// Required key prefix, if the vendor has one.
    pub key_prefix: Option<&'static str>,
}

/// Groq's OpenAI-compatible endpoint.
pub const GROQ: CompatibleProfile = CompatibleProfile {
    name: "groq",
    base_url: "https://api.groq.com/openai/v1",
    model: "llama-3.1-8b-instant",
    priority: 1,
    key_env: "GROQ_API_KEY",
    key_prefix: Some("gsk_"),
};

/// Chat-completions provider for an OpenAI-compatible API.
pub struct OpenAICompatibleProvider {
    client: Client,
    profile: CompatibleProfile,
    api_key: Option<String>,
    model: String,
    base_url: String,
    priority: u32,
    disabled: bool,
}

impl OpenAICompatibleProvider {
    pub fn new(profile: CompatibleProfile, api_key: Option<String>, settings: ProviderSettings) -> Self {
        Self {
            client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
            profile,
            api_key,
            model: settings.model.clone().unwrap_or_else(|| profile.model.to_string()),
            base_url: settings.base_url_or(profile.base_url),
            priority: settings.priority.unwrap_or(profile.priority),
            disabled: settings.disabled,
        }
    }

    /// Groq instance.
    pub fn groq(api_key: Option<String>, settings: ProviderSettings) -> Self {
        Self::new(GROQ, api_key, settings)
    }

    fn build_request(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: Some(request.prompt.clone()),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            temperature: None,
        }
    }

    fn handle_error_response(status_code: u16, body: &str) -> ProviderError {
        let Ok(error) = serde_json::from_str::<ApiError>(body) else {
            return ProviderError::from_status(status_code, body);
        };
        let detail = error.error;
        let kinds = [detail.code.as_deref(), detail.error_type.as_deref()];
        let is = |names: &[&str]| kinds.iter().flatten().any(|k| names.contains(k));

        if is(&["authentication_error", "invalid_api_key"]) {
            ProviderError::AuthError(detail.message)
        } else if is(&["rate_limit_error", "rate_limit_exceeded", "tokens"]) {
            ProviderError::RateLimited(detail.message)
        } else {
            ProviderError::from_status(status_code, &detail.message)
        }
    }

    fn extract_text(&self, response: ChatResponse) -> Result<String, ProviderError> {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(ProviderError::EmptyResponse(self.profile.name.to_string()))
        } else {
            Ok(text)
        }
    }
}

impl Backend for OpenAICompatibleProvider {
    fn name(&self) -> &str {
        self.profile.name
    }

    fn capability(&self) -> Capability {
        Capability::Generate
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        if self.disabled {
            return false;
        }
        match self.profile.key_prefix {
            Some(prefix) => credentials::is_usable_with_prefix(self.api_key.as_deref(), prefix),
            None => credentials::is_usable(self.api_key.as_deref()),
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAICompatibleProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} not set", self.profile.key_env))
        })?;
        let body = self.build_request(request);
        let start = Instant::now();

        debug!(provider = self.profile.name, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(ProviderError::from)?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation(&format!("{}.generate", self.profile.name), start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        self.extract_text(chat)
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}
