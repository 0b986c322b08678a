#![allow(dead_code)]

use adaptive_learning_api::{
    config::Config,
    create_router,
    engine::{Credential, CredentialPool, FailureReason, GenerativeProvider},
    models::attempt::{RawRecord, RecordSource},
    services::{datastore::InMemoryAttemptStore, AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;

pub const LEARNER: &str = "learner-1";

/// Replies by prompt prefix, or by credential slot when built with
/// `per_credential`; anything unmatched fails like an unreachable provider.
pub struct ScriptedProvider {
    routes: Vec<(&'static str, Result<String, FailureReason>)>,
    by_slot: Vec<Result<String, FailureReason>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(routes: Vec<(&'static str, Result<String, FailureReason>)>) -> Arc<Self> {
        Arc::new(Self {
            routes,
            by_slot: Vec::new(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn per_credential(replies: Vec<Result<String, FailureReason>>) -> Arc<Self> {
        Arc::new(Self {
            routes: Vec::new(),
            by_slot: replies,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeProvider for ScriptedProvider {
    async fn generate(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<String, FailureReason> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.by_slot.is_empty() {
            return self
                .by_slot
                .get(credential.slot())
                .cloned()
                .unwrap_or_else(|| Err(FailureReason::Network("connection refused".into())));
        }
        self.routes
            .iter()
            .find(|(prefix, _)| prompt.starts_with(prefix))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Err(FailureReason::Network("connection refused".into())))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn test_config(credentials: &[&str]) -> Config {
    let mut config = Config::default();
    config.ai.credentials = CredentialPool::new(credentials.iter().copied());
    config.ai.call_timeout_secs = 2;
    config.ai.request_deadline_secs = 5;
    config
}

pub fn create_test_app(
    store: Arc<InMemoryAttemptStore>,
    provider: Arc<ScriptedProvider>,
) -> Router {
    create_test_app_with(test_config(&["key-one", "key-two"]), store, provider)
}

pub fn create_test_app_with(
    config: Config,
    store: Arc<InMemoryAttemptStore>,
    provider: Arc<ScriptedProvider>,
) -> Router {
    init_tracing();
    let state = AppState::with_components(config, store, provider);
    create_router(Arc::new(state))
}

pub fn row(value: Value) -> RawRecord {
    value.as_object().cloned().expect("test rows are JSON objects")
}

/// Two sources, newest first: strong at geometry, weak at algebra, improving overall.
pub fn seeded_store() -> Arc<InMemoryAttemptStore> {
    let store = Arc::new(InMemoryAttemptStore::new());
    store.insert_attempts(
        LEARNER,
        RecordSource::Performance,
        vec![
            row(json!({
                "topic": "geometry", "difficulty": "medium", "score": 9,
                "total_questions": 10, "time_spent": 300, "created_at": "2024-05-06T09:00:00Z"
            })),
            row(json!({
                "topic": "algebra", "difficulty": "easy", "score": 5,
                "total_questions": 10, "time_spent": 420, "created_at": "2024-05-04T09:00:00Z"
            })),
            row(json!({
                "topic": "algebra", "difficulty": "easy", "score": 3,
                "total_questions": 10, "time_spent": 480, "created_at": "2024-05-01T09:00:00Z"
            })),
        ],
    );
    store.insert_attempts(
        LEARNER,
        RecordSource::QuizAttempts,
        vec![
            row(json!({
                "subject": "Geometry", "difficulty_level": "medium", "correct_answers": 10,
                "questions_count": 10, "time_taken": 240, "completed_at": "2024-05-05T09:00:00Z"
            })),
            row(json!({
                "subject": "algebra", "difficulty_level": "easy", "correct_answers": 4,
                "questions_count": 10, "time_taken": 500, "completed_at": "2024-05-02T09:00:00Z"
            })),
        ],
    );
    store
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
