// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Failover Orchestrator: walk a capability's providers until one succeeds.
//!
//! Providers are tried once each, in priority order. Between attempts the
//! orchestrator sleeps for the backoff delay of the failed attempt's index.
//! There is no overall deadline; callers that need one wrap the call in
//! `tokio::time::timeout`.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn, Instrument};

use super::backoff::BackoffPolicy;
use super::output::{ProviderOutput, Rejection};
use super::registry::{CapabilityKind, ProviderRegistry};
use crate::error::{GatewayError, ProviderError, ProviderFailure};
use crate::telemetry::{failover_span, AttemptSpan, CorrelationId};
use crate::types::{AttemptOutcome, AttemptRecord, Capability};

/// Outcome of a successful failover walk.
#[derive(Debug, Clone)]
pub struct Execution<T> {
    /// The accepted value.
    pub value: T,
    /// Provider that produced `value`.
    pub provider_name: String,
    /// Number of providers invoked, including the successful one.
    pub attempt_count: usize,
    /// One record per invoked provider, in order.
    pub attempts: Vec<AttemptRecord>,
}

/// Walks providers with backoff between failures.
#[derive(Debug, Clone)]
pub struct FailoverOrchestrator {
    registry: Arc<ProviderRegistry>,
    backoff: BackoffPolicy,
}

impl FailoverOrchestrator {
    /// Create an orchestrator over a registry.
    pub fn new(registry: Arc<ProviderRegistry>, backoff: BackoffPolicy) -> Self {
        Self { registry, backoff }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Run `operation` against the available providers of capability `P`.
    ///
    /// ```rust,ignore
    /// let execution = orchestrator
    ///     .execute::<dyn GenerationProvider, _, _, _>(|provider| {
    ///         let request = request.clone();
    ///         async move { provider.generate(&request).await }
    ///     })
    ///     .await?;
    /// ```
    pub async fn execute<P, T, F, Fut>(&self, operation: F) -> Result<Execution<T>, GatewayError>
    where
        P: CapabilityKind + ?Sized,
        T: ProviderOutput,
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let providers = self.registry.available::<P>();
        self.execute_over(P::CAPABILITY, providers, operation).await
    }

    /// Run `operation` over an explicit, already-ordered provider list.
    pub async fn execute_over<P, T, F, Fut>(
        &self,
        capability: Capability,
        providers: Vec<Arc<P>>,
        mut operation: F,
    ) -> Result<Execution<T>, GatewayError>
    where
        P: CapabilityKind + ?Sized,
        T: ProviderOutput,
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if providers.is_empty() {
            warn!(capability = %capability, "No providers available");
            return Err(GatewayError::NoProvidersAvailable { capability });
        }

        let correlation_id = CorrelationId::new();
        let span = failover_span(capability, &correlation_id);
        let walk_span = span.clone();
        let backoff = self.backoff;

        async move {
            let total = providers.len();
            let mut attempts = Vec::with_capacity(total);
            let mut failures = Vec::with_capacity(total);

            for (index, provider) in providers.into_iter().enumerate() {
                let name = provider.name().to_string();
                let attempt = AttemptSpan::start(&name);
                let result = operation(provider).instrument(attempt.span().clone()).await;

                let (outcome, reason) = match result {
                    Ok(value) => match value.check() {
                        Ok(()) => {
                            attempts.push(attempt.finish(AttemptOutcome::Success, None));
                            let attempt_count = index + 1;
                            walk_span.record("provider", name.as_str());
                            walk_span.record("attempts", attempt_count);
                            if index > 0 {
                                info!(provider = %name, attempts = attempt_count, "Failover succeeded on fallback provider");
                            }
                            return Ok(Execution {
                                value,
                                provider_name: name,
                                attempt_count,
                                attempts,
                            });
                        }
                        Err(rejection @ Rejection::Empty(_)) => {
                            (AttemptOutcome::EmptyResult, rejection.to_string())
                        }
                        Err(rejection @ Rejection::Malformed(_)) => {
                            (AttemptOutcome::Error, rejection.to_string())
                        }
                    },
                    Err(err @ ProviderError::EmptyResponse(_)) => {
                        (AttemptOutcome::EmptyResult, err.to_string())
                    }
                    Err(err) => (AttemptOutcome::Error, err.to_string()),
                };

                warn!(provider = %name, outcome = %outcome, reason = %reason, "Provider attempt failed");
                attempts.push(attempt.finish(outcome, Some(reason.clone())));
                failures.push(ProviderFailure {
                    provider: name,
                    outcome,
                    reason,
                });

                if index + 1 < total {
                    let delay = backoff.delay(index as u32);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            walk_span.record("attempts", total);
            Err(GatewayError::AllProvidersFailed {
                capability,
                failures,
            })
        }
        .instrument(span)
        .await
    }
}
