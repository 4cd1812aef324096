// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Generation Gateway: text completion with failover across LLM backends.

#[cfg(feature = "telemetry")]
use std::time::Instant;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::error::GatewayError;
use crate::failover::FailoverOrchestrator;
use crate::providers::GenerationProvider;
use crate::types::{Generation, GenerationRequest};

#[derive(Debug, Clone)]
pub struct GenerationGateway {
    orchestrator: FailoverOrchestrator,
    default_system_prompt: Option<String>,
}

impl GenerationGateway {
    pub fn new(orchestrator: FailoverOrchestrator) -> Self {
        Self {
            orchestrator,
            default_system_prompt: None,
        }
    }

    /// System prompt used when a call passes none.
    pub fn with_default_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.default_system_prompt = system_prompt;
        self
    }

    /// Generate text for `prompt`, falling through providers on error or blank output.
    pub async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<Generation, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::InvalidInput("prompt is empty".to_string()));
        }

        let request = GenerationRequest::new(prompt)
            .with_system_prompt(system_prompt.or(self.default_system_prompt.as_deref()));

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let execution = self
            .orchestrator
            .execute::<dyn GenerationProvider, _, _, _>(|provider| {
                let request = request.clone();
                async move { provider.generate(&request).await }
            })
            .await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("gateway.generate", start.elapsed());

        let execution = execution?;
        Ok(Generation {
            text: execution.value,
            provider_name: execution.provider_name,
            attempts: execution.attempt_count,
            attempt_log: execution.attempts,
        })
    }
}
