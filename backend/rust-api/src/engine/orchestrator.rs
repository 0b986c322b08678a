use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use crate::metrics;
use crate::models::analysis::AnalysisTask;

use super::credentials::{Credential, CredentialPool};
use super::json_repair;

/// Why a single provider attempt (or a whole orchestration) produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider call timed out")]
    Timeout,
    #[error("provider rejected the request (status {0})")]
    ProviderRejected(u16),
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("provider output is not valid JSON")]
    MalformedOutput,
    #[error("output failed schema validation: {0}")]
    SchemaViolation(String),
    #[error("request deadline exceeded")]
    DeadlineExceeded,
    #[error("no provider credentials configured")]
    NoCredentials,
}

impl FailureReason {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::Network(_) => "network",
            FailureReason::Timeout => "timeout",
            FailureReason::ProviderRejected(_) => "rejected",
            FailureReason::EmptyResponse => "empty",
            FailureReason::MalformedOutput => "malformed",
            FailureReason::SchemaViolation(_) => "schema_violation",
            FailureReason::DeadlineExceeded => "deadline",
            FailureReason::NoCredentials => "no_credentials",
        }
    }
}

/// External generative model.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn generate(&self, prompt: &str, credential: &Credential)
        -> Result<String, FailureReason>;
}

/// One call against one credential slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CallAttempt {
    pub slot: usize,
    pub elapsed: Duration,
    pub failure: Option<FailureReason>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AiOutcome {
    Success {
        payload: Value,
        attempts: Vec<CallAttempt>,
    },
    Exhausted {
        reason: FailureReason,
        attempts: Vec<CallAttempt>,
    },
}

impl AiOutcome {
    pub fn payload(&self) -> Option<&Value> {
        match self {
            AiOutcome::Success { payload, .. } => Some(payload),
            AiOutcome::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> &[CallAttempt] {
        match self {
            AiOutcome::Success { attempts, .. } | AiOutcome::Exhausted { attempts, .. } => {
                attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AiOutcome::Success { .. })
    }
}

/// Runs one prompt across the credential pool until a reply parses.
///
/// Slots are tried strictly in order with no backoff. Every call is bounded by
/// `call_timeout` and by whatever remains of the caller's deadline.
#[derive(Clone)]
pub struct AiOrchestrator {
    provider: Arc<dyn GenerativeProvider>,
    credentials: CredentialPool,
    call_timeout: Duration,
}

impl AiOrchestrator {
    pub fn new(
        provider: Arc<dyn GenerativeProvider>,
        credentials: CredentialPool,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            credentials,
            call_timeout,
        }
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    pub async fn run(&self, task: AnalysisTask, prompt: &str, deadline: Instant) -> AiOutcome {
        let mut attempts = Vec::new();

        if self.credentials.is_empty() {
            tracing::debug!(task = task.as_str(), "no credentials configured, skipping AI path");
            metrics::record_ai_call(task.as_str(), FailureReason::NoCredentials.kind(), 0.0);
            return AiOutcome::Exhausted {
                reason: FailureReason::NoCredentials,
                attempts,
            };
        }

        let mut last_failure = FailureReason::NoCredentials;

        for credential in self.credentials.iter() {
            let now = Instant::now();
            if now >= deadline {
                last_failure = FailureReason::DeadlineExceeded;
                tracing::warn!(
                    task = task.as_str(),
                    slot = credential.slot(),
                    "deadline reached before trying remaining credentials"
                );
                break;
            }
            let budget = self.call_timeout.min(deadline - now);

            tracing::debug!(
                task = task.as_str(),
                slot = credential.slot(),
                prompt_len = prompt.len(),
                "calling generative provider"
            );

            let started = Instant::now();
            let call = self.provider.generate(prompt, credential);
            let result = match tokio::time::timeout(budget, call).await {
                Ok(Ok(text)) => parse_payload(&text),
                Ok(Err(reason)) => Err(reason),
                Err(_) => Err(FailureReason::Timeout),
            };
            let elapsed = started.elapsed();

            match result {
                Ok(payload) => {
                    metrics::record_ai_call(task.as_str(), "success", elapsed.as_secs_f64());
                    attempts.push(CallAttempt {
                        slot: credential.slot(),
                        elapsed,
                        failure: None,
                    });
                    tracing::info!(
                        task = task.as_str(),
                        slot = credential.slot(),
                        attempts = attempts.len(),
                        "generative provider returned parseable output"
                    );
                    return AiOutcome::Success { payload, attempts };
                }
                Err(reason) => {
                    metrics::record_ai_call(task.as_str(), reason.kind(), elapsed.as_secs_f64());
                    tracing::warn!(
                        task = task.as_str(),
                        slot = credential.slot(),
                        failure = reason.kind(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "generative provider attempt failed, moving to next credential"
                    );
                    attempts.push(CallAttempt {
                        slot: credential.slot(),
                        elapsed,
                        failure: Some(reason.clone()),
                    });
                    last_failure = reason;
                }
            }
        }

        tracing::warn!(
            task = task.as_str(),
            attempts = attempts.len(),
            failure = last_failure.kind(),
            "all credentials exhausted, falling back to statistics"
        );
        AiOutcome::Exhausted {
            reason: last_failure,
            attempts,
        }
    }
}

fn parse_payload(text: &str) -> Result<Value, FailureReason> {
    if text.trim().is_empty() {
        return Err(FailureReason::EmptyResponse);
    }
    json_repair::parse_reply(text).ok_or(FailureReason::MalformedOutput)
}
