// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Anthropic Claude generation provider.
//!
//! Uses the non-streaming Messages API. Only text blocks are read from the
//! response; advice generation needs neither tools nor images.
//!
//! See [Anthropic Messages API](https://docs.anthropic.com/en/api/messages).

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

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
const DEFAULT_PRIORITY: u32 = 2;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Expected credential prefix.
const KEY_PREFIX: &str = "sk-ant-";

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    priority: u32,
    max_tokens: u32,
    disabled: bool,
}

impl AnthropicProvider {
    pub const NAME: &'static str = "anthropic";

    /// Create the provider. A missing key leaves it registered but unavailable.
    pub fn new(api_key: Option<String>, settings: ProviderSettings) -> Self {
        Self {
            client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
            api_key,
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            priority: settings.priority.unwrap_or(DEFAULT_PRIORITY),
            max_tokens: DEFAULT_MAX_TOKENS,
            disabled: settings.disabled,
        }
    }

    fn build_request(&self, request: &GenerationRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            system: request.system_prompt.clone(),
        }
    }

    /// Map an error response to a provider error.
    fn handle_error_response(status_code: u16, body: &str) -> ProviderError {
        if let Ok(error) = serde_json::from_str::<ApiError>(body) {
            match error.error.error_type.as_str() {
                "authentication_error" | "permission_error" => {
                    ProviderError::AuthError(error.error.message)
                }
                "rate_limit_error" => ProviderError::RateLimited(error.error.message),
                "overloaded_error" => ProviderError::RateLimited("API overloaded".to_string()),
                _ => ProviderError::api(error.error.message, status_code),
            }
        } else {
            ProviderError::from_status(status_code, body)
        }
    }

    /// Concatenate the text blocks of a response.
    fn extract_text(response: ApiResponse) -> Result<String, ProviderError> {
        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            Err(ProviderError::EmptyResponse(Self::NAME.to_string()))
        } else {
            Ok(text)
        }
    }
}

impl Backend for AnthropicProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capability(&self) -> Capability {
        Capability::Generate
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        !self.disabled && credentials::is_usable_with_prefix(self.api_key.as_deref(), KEY_PREFIX)
    }
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("ANTHROPIC_API_KEY not set".to_string()))?;
        let body = self.build_request(request);
        let start = Instant::now();

        debug!(model = %self.model, prompt_len = request.prompt.len(), "Sending Anthropic request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            #[cfg(feature = "telemetry")]
            GLOBAL_METRICS.record_operation("anthropic.generate", start.elapsed());
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(ProviderError::from)?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("anthropic.generate", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Self::extract_text(api_response)
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
