//! Request execution with retry

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::context::{ContextError, RequestContext};
use super::prompt::Prompt;
use super::retry::{RetryPolicy, RetryState};
use super::schema::{ResponseValidationError, ResponseValidator, response_format};
use crate::config::{CompletionConfig, EnrichmentConfig};
use crate::core::providers::{CompletionProvider, ProviderError};
use crate::core::types::{Batch, ChatRequest, EnrichmentResponse};

/// Why a single attempt failed
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("completion returned no choices")]
    EmptyChoices,

    #[error("completion returned empty content")]
    EmptyContent,

    #[error(transparent)]
    Validation(#[from] ResponseValidationError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl AttemptError {
    /// Whether another attempt is likely to succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::EmptyChoices | Self::EmptyContent | Self::Validation(_) => true,
            Self::Context(_) => false,
        }
    }
}

/// Terminal result of one batch
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStatus {
    Succeeded(EnrichmentResponse),
    /// Every attempt failed; the batch is lost for this run
    Exhausted { last_error: String },
    /// The context ended before the batch succeeded
    Cancelled { reason: ContextError },
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub batch_index: usize,
    pub status: ExecutionStatus,
    pub attempts: u32,
    /// Backoff delays that were fully slept
    pub backoffs: Vec<Duration>,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Succeeded(_))
    }

    pub fn response(&self) -> Option<&EnrichmentResponse> {
        match &self.status {
            ExecutionStatus::Succeeded(response) => Some(response),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<EnrichmentResponse> {
        match self.status {
            ExecutionStatus::Succeeded(response) => Some(response),
            _ => None,
        }
    }
}

/// Runs one batch against a provider until it succeeds, exhausts its
/// attempts, or its context ends
pub struct RequestExecutor {
    provider: Arc<dyn CompletionProvider>,
    policy: RetryPolicy,
    model: String,
    temperature: Option<f32>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("provider", &self.provider.name())
            .field("policy", &self.policy)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl RequestExecutor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        policy: RetryPolicy,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            policy,
            model: model.into(),
            temperature: None,
        }
    }

    pub fn from_config(
        provider: Arc<dyn CompletionProvider>,
        completion: &CompletionConfig,
        enrichment: &EnrichmentConfig,
    ) -> Self {
        Self::new(
            provider,
            RetryPolicy::from_config(enrichment),
            completion.model.clone(),
        )
        .with_temperature(completion.temperature)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Completion request for `batch`
    pub fn build_request(&self, batch: &Batch, prompt: &Prompt) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: prompt.messages().to_vec(),
            response_format: Some(response_format(batch.len())),
            temperature: self.temperature,
        }
    }

    /// Drive `batch` through the retry state machine
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        batch: &Batch,
        prompt: &Prompt,
    ) -> ExecutionOutcome {
        let started = Instant::now();
        let index = batch.index();

        let finish = |status, attempts, backoffs| ExecutionOutcome {
            batch_index: index,
            status,
            attempts,
            backoffs,
            elapsed: started.elapsed(),
        };

        let validator = match ResponseValidator::for_batch(batch) {
            Ok(validator) => validator,
            Err(e) => {
                return finish(
                    ExecutionStatus::Exhausted {
                        last_error: e.to_string(),
                    },
                    0,
                    Vec::new(),
                );
            }
        };

        let request = self.build_request(batch, prompt);
        let mut backoffs = Vec::new();
        let mut last_error = String::new();
        let mut cancel_reason = ContextError::Cancelled;
        let mut response = None;
        let mut state = RetryState::Pending;

        let terminal = loop {
            state = match state {
                RetryState::Pending => self.policy.begin(),
                RetryState::Attempting { attempt } => {
                    if let Some(reason) = ctx.err() {
                        cancel_reason = reason;
                        RetryState::Cancelled {
                            attempts: attempt - 1,
                        }
                    } else {
                        debug!(batch = index, attempt, items = batch.len(), "Sending batch");
                        match self.attempt(ctx, &request, &validator).await {
                            Ok(parsed) => {
                                response = Some(parsed);
                                RetryState::Succeeded { attempts: attempt }
                            }
                            Err(AttemptError::Context(reason)) => {
                                cancel_reason = reason;
                                RetryState::Cancelled { attempts: attempt }
                            }
                            Err(e) => {
                                if e.is_retryable() {
                                    warn!(batch = index, attempt, error = %e, "Batch attempt failed");
                                } else {
                                    error!(batch = index, attempt, error = %e, "Batch attempt failed with a non-transient error");
                                }
                                last_error = e.to_string();
                                self.policy.after_failure(attempt)
                            }
                        }
                    }
                }
                RetryState::BackingOff { attempt, delay } => {
                    debug!(batch = index, attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                    match ctx.sleep(delay).await {
                        Ok(()) => {
                            backoffs.push(delay);
                            state.resume()
                        }
                        Err(reason) => {
                            cancel_reason = reason;
                            RetryState::Cancelled { attempts: attempt }
                        }
                    }
                }
                terminal => break terminal,
            };
        };

        match (terminal, response) {
            (RetryState::Succeeded { attempts }, Some(parsed)) => {
                debug!(batch = index, attempts, reviews = parsed.len(), "Batch succeeded");
                finish(ExecutionStatus::Succeeded(parsed), attempts, backoffs)
            }
            (RetryState::Cancelled { attempts }, _) => finish(
                ExecutionStatus::Cancelled {
                    reason: cancel_reason,
                },
                attempts,
                backoffs,
            ),
            (state, _) => finish(
                ExecutionStatus::Exhausted { last_error },
                state.attempts(),
                backoffs,
            ),
        }
    }

    async fn attempt(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
        validator: &ResponseValidator,
    ) -> Result<EnrichmentResponse, AttemptError> {
        let response = ctx.run(self.provider.complete(request)).await??;

        if response.choices.is_empty() {
            return Err(AttemptError::EmptyChoices);
        }

        let content = response
            .first_content()
            .filter(|content| !content.trim().is_empty())
            .ok_or(AttemptError::EmptyContent)?;

        Ok(validator.parse(content)?)
    }
}
