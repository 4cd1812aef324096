// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Google Gemini generation provider.

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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_PRIORITY: u32 = 0;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Google API keys start with this.
const KEY_PREFIX: &str = "AIza";

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    priority: u32,
    disabled: bool,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &self.api_key.as_deref().map(credentials::redact))
            .field("model", &self.model)
            .field("priority", &self.priority)
            .finish()
    }
}

impl GeminiProvider {
    pub const NAME: &'static str = "gemini";

    pub fn new(api_key: Option<String>, settings: ProviderSettings) -> Self {
        Self {
            client: http_client(settings.timeout_or(DEFAULT_TIMEOUT)),
            api_key,
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            priority: settings.priority.unwrap_or(DEFAULT_PRIORITY),
            disabled: settings.disabled,
        }
    }

    fn build_request(request: &GenerationRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(request.prompt.clone()),
                }],
            }],
            system_instruction: request.system_prompt.as_ref().map(|system| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(system.clone()),
                }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            },
        }
    }

    /// Text of the first candidate. Safety blocks come back with no parts.
    fn extract_text(response: GeminiResponse) -> Result<String, ProviderError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse(Self::NAME.to_string()))?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "no text".to_string());
            debug!(finish_reason = %reason, "Gemini returned no text");
            Err(ProviderError::EmptyResponse(format!("{} ({})", Self::NAME, reason)))
        } else {
            Ok(text)
        }
    }
}

impl Backend for GeminiProvider {
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
impl GenerationProvider for GeminiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("GEMINI_API_KEY not set".to_string()))?;
        let start = Instant::now();

        debug!(model = %self.model, "Sending Gemini request");

        // Key in a header, not the query string, so it never lands in URL logs
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            // Gemini reports bad keys as 400 INVALID_ARGUMENT
            if message.contains("API key not valid") {
                return Err(ProviderError::AuthError(message));
            }
            return Err(ProviderError::from_status(status.as_u16(), &message));
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(ProviderError::from)?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("gemini.generate", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Self::extract_text(api_response)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability() {
        let ok = GeminiProvider::new(Some("AIzaSyA1b2C3d4E5f6G7h8".into()), ProviderSettings::default());
        assert!(ok.is_available());
        assert_eq!(ok.priority(), 0);

        let wrong = GeminiProvider::new(Some("sk-ant-api03-abcdefgh".into()), ProviderSettings::default());
        assert!(!wrong.is_available());
        assert!(!GeminiProvider::new(None, ProviderSettings::default()).is_available());
    }

    #[test]
    fn test_debug_redacts_key() {
        let p = GeminiProvider::new(Some("AIzaSyA1b2C3d4E5f6G7h8".into()), ProviderSettings::default());
        let debug = format!("{:?}", p);
        assert!(debug.contains("AIza****"));
        assert!(!debug.contains("SyA1b2"));
    }

    #[test]
    fn test_request_shape() {
        let req = GenerationRequest::new("Is it time to irrigate?")
            .with_system_prompt(Some("You advise smallholder farmers."));
        let json = serde_json::to_value(GeminiProvider::build_request(&req)).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "Is it time to irrigate?");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You advise smallholder farmers."
        );
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_extract_text() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Yes, "},{"text":"irrigate today."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(GeminiProvider::extract_text(response).unwrap(), "Yes, irrigate today.");
    }

    #[test]
    fn test_safety_block_is_empty() {
        let response: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        match GeminiProvider::extract_text(response) {
            Err(ProviderError::EmptyResponse(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("expected EmptyResponse, got {:?}", other),
        }

        let none: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(GeminiProvider::extract_text(none).is_err());
    }
}
