use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::engine::{Credential, CredentialPool, FailureReason, GenerativeProvider};
use crate::models::attempt::{RawRecord, RecordSource};
use crate::services::{
    datastore::{AttemptStore, InMemoryAttemptStore},
    AppState,
};

/// Answers by prompt prefix; unmatched prompts fail with a network error.
pub struct RoutedProvider {
    routes: Vec<(&'static str, String)>,
    pub calls: Mutex<usize>,
}

impl RoutedProvider {
    pub fn new(routes: Vec<(&'static str, &str)>) -> Arc<Self> {
        Arc::new(Self {
            routes: routes
                .into_iter()
                .map(|(prefix, reply)| (prefix, reply.to_string()))
                .collect(),
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl GenerativeProvider for RoutedProvider {
    async fn generate(&self, prompt: &str, _: &Credential) -> Result<String, FailureReason> {
        *self.calls.lock().unwrap() += 1;
        self.routes
            .iter()
            .find(|(prefix, _)| prompt.starts_with(prefix))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| FailureReason::Network("unreachable".into()))
    }
}

pub fn row(value: Value) -> RawRecord {
    value.as_object().cloned().unwrap()
}

pub fn state(store: Arc<InMemoryAttemptStore>, provider: Arc<RoutedProvider>) -> AppState {
    let mut config = Config::default();
    config.ai.credentials = CredentialPool::new(["test-key"]);
    AppState::with_components(config, store, provider)
}

/// Answers every attempt query with one record, but only after `delay`.
pub struct SlowStore {
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AttemptStore for SlowStore {
    async fn fetch_attempts(
        &self,
        _user_id: &str,
        _source: RecordSource,
        _limit: u32,
    ) -> anyhow::Result<Vec<RawRecord>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![row(serde_json::json!({
            "topic": "math", "score": 5, "total_questions": 10
        }))])
    }

    async fn fetch_preferences(&self, _user_id: &str) -> anyhow::Result<Option<RawRecord>> {
        Ok(None)
    }

    async fn fetch_candidates(&self, _limit: u32) -> anyhow::Result<Vec<RawRecord>> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
