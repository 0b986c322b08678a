use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::config::HistoryConfig;
use crate::engine::normalizer;
use crate::models::{
    attempt::{AttemptRecord, RawRecord, RecordSource},
    content::CandidateContent,
    profile::LearnerPreferences,
};
use crate::services::AppState;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

use super::datastore::AttemptStore;

/// Loads and normalizes everything the engine reads about a learner.
///
/// Datastore failures never escape: after the retries are spent the caller
/// sees an empty history, which the engine treats like a new learner.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn AttemptStore>,
    limits: HistoryConfig,
    retry: RetryConfig,
}

impl HistoryService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(state.store.clone(), state.config.history)
    }

    pub fn with_store(store: Arc<dyn AttemptStore>, limits: HistoryConfig) -> Self {
        Self {
            store,
            limits,
            retry: RetryConfig::datastore(),
        }
    }

    /// Both attempt sources, merged newest first.
    pub async fn load_attempts(&self, user_id: &str) -> Vec<AttemptRecord> {
        let (performance, quiz_attempts) = tokio::join!(
            self.fetch_source(user_id, RecordSource::Performance, self.limits.performance_limit),
            self.fetch_source(user_id, RecordSource::QuizAttempts, self.limits.quiz_attempt_limit),
        );

        let records = normalizer::merge_sources(
            normalizer::normalize_records(user_id, RecordSource::Performance, &performance),
            normalizer::normalize_records(user_id, RecordSource::QuizAttempts, &quiz_attempts),
        );

        tracing::debug!(
            user_id,
            performance = performance.len(),
            quiz_attempts = quiz_attempts.len(),
            "Loaded learner history"
        );
        records
    }

    /// Like [`Self::load_attempts`], but gives up at `deadline` with an empty
    /// history so a slow datastore cannot hold the request past its budget.
    pub async fn load_attempts_until(
        &self,
        user_id: &str,
        deadline: Instant,
    ) -> Vec<AttemptRecord> {
        match tokio::time::timeout_at(deadline, self.load_attempts(user_id)).await {
            Ok(records) => {
                let budget_left = deadline.saturating_duration_since(Instant::now());
                tracing::debug!(
                    user_id,
                    budget_left_ms = budget_left.as_millis() as u64,
                    "History loaded within request budget"
                );
                records
            }
            Err(_) => {
                tracing::warn!(
                    user_id,
                    "History load reached the request deadline, continuing without history"
                );
                Vec::new()
            }
        }
    }

    pub async fn load_preferences(&self, user_id: &str) -> LearnerPreferences {
        let row = self
            .with_retry("user_preferences", || self.store.fetch_preferences(user_id))
            .await
            .flatten();
        normalizer::normalize_preferences(row.as_ref())
    }

    pub async fn load_candidates(&self, limit: u32) -> Vec<CandidateContent> {
        self.with_retry("candidates", || self.store.fetch_candidates(limit))
            .await
            .unwrap_or_default()
            .iter()
            .map(normalizer::normalize_candidate)
            .collect()
    }

    async fn fetch_source(
        &self,
        user_id: &str,
        source: RecordSource,
        limit: u32,
    ) -> Vec<RawRecord> {
        self.with_retry(source.collection(), || {
            self.store.fetch_attempts(user_id, source, limit)
        })
        .await
        .unwrap_or_default()
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, f: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match retry_async_with_config(self.retry.clone(), f).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    source = what,
                    error = %e,
                    "Datastore read failed after retries, continuing without it"
                );
                None
            }
        }
    }
}
