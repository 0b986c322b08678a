use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::FindOptions,
    Database,
};
use serde_json::Value;

use crate::metrics::track_db_operation;
use crate::models::attempt::{RawRecord, RecordSource};

const PREFERENCES_COLLECTION: &str = "user_preferences";
const MATERIALS_COLLECTION: &str = "study_materials";
const QUIZZES_COLLECTION: &str = "quizzes";

/// Narrow read interface over whatever holds learner history.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Newest first, at most `limit` rows.
    async fn fetch_attempts(
        &self,
        user_id: &str,
        source: RecordSource,
        limit: u32,
    ) -> Result<Vec<RawRecord>>;

    async fn fetch_preferences(&self, user_id: &str) -> Result<Option<RawRecord>>;

    /// Up to `limit` rows from each content collection.
    async fn fetch_candidates(&self, limit: u32) -> Result<Vec<RawRecord>>;

    async fn ping(&self) -> Result<()>;
}

pub struct MongoAttemptStore {
    mongo: Database,
}

impl MongoAttemptStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    async fn find_raw(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
        limit: u32,
    ) -> Result<Vec<RawRecord>> {
        let options = FindOptions::builder()
            .sort(sort)
            .limit(i64::from(limit))
            .build();

        let mut cursor = self
            .mongo
            .collection::<Document>(collection)
            .find(filter)
            .with_options(options)
            .await
            .with_context(|| format!("Failed to query {}", collection))?;

        let mut rows = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .with_context(|| format!("Failed to iterate {}", collection))?
        {
            rows.push(document_to_raw(document));
        }
        Ok(rows)
    }
}

/// Relaxed extended JSON keeps dates as `{"$date": ..}` and ids as `{"$oid": ..}`.
fn document_to_raw(document: Document) -> RawRecord {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

fn user_filter(user_id: &str) -> Document {
    match ObjectId::parse_str(user_id) {
        Ok(oid) => doc! { "user_id": { "$in": [user_id, oid] } },
        Err(_) => doc! { "user_id": user_id },
    }
}

#[async_trait]
impl AttemptStore for MongoAttemptStore {
    async fn fetch_attempts(
        &self,
        user_id: &str,
        source: RecordSource,
        limit: u32,
    ) -> Result<Vec<RawRecord>> {
        track_db_operation(
            "find",
            source.collection(),
            self.find_raw(
                source.collection(),
                user_filter(user_id),
                Some(doc! { "created_at": -1 }),
                limit,
            ),
        )
        .await
    }

    async fn fetch_preferences(&self, user_id: &str) -> Result<Option<RawRecord>> {
        let rows = track_db_operation(
            "find_one",
            PREFERENCES_COLLECTION,
            self.find_raw(PREFERENCES_COLLECTION, user_filter(user_id), None, 1),
        )
        .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_candidates(&self, limit: u32) -> Result<Vec<RawRecord>> {
        let materials = track_db_operation(
            "find",
            MATERIALS_COLLECTION,
            self.find_raw(
                MATERIALS_COLLECTION,
                doc! { "ai_analysis": { "$exists": true } },
                Some(doc! { "created_at": -1 }),
                limit,
            ),
        )
        .await?;

        let quizzes = track_db_operation(
            "find",
            QUIZZES_COLLECTION,
            self.find_raw(
                QUIZZES_COLLECTION,
                Document::new(),
                Some(doc! { "created_at": -1 }),
                limit,
            ),
        )
        .await?;

        Ok(materials.into_iter().chain(quizzes).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.mongo
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }
}

/// Process-local store for tests and offline runs.
#[derive(Default)]
pub struct InMemoryAttemptStore {
    attempts: RwLock<HashMap<(String, RecordSource), Vec<RawRecord>>>,
    preferences: RwLock<HashMap<String, RawRecord>>,
    candidates: RwLock<Vec<RawRecord>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows must already be newest first.
    pub fn insert_attempts(&self, user_id: &str, source: RecordSource, rows: Vec<RawRecord>) {
        if let Ok(mut attempts) = self.attempts.write() {
            attempts
                .entry((user_id.to_string(), source))
                .or_default()
                .extend(rows);
        }
    }

    pub fn set_preferences(&self, user_id: &str, row: RawRecord) {
        if let Ok(mut preferences) = self.preferences.write() {
            preferences.insert(user_id.to_string(), row);
        }
    }

    pub fn insert_candidates(&self, rows: Vec<RawRecord>) {
        if let Ok(mut candidates) = self.candidates.write() {
            candidates.extend(rows);
        }
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn fetch_attempts(
        &self,
        user_id: &str,
        source: RecordSource,
        limit: u32,
    ) -> Result<Vec<RawRecord>> {
        let attempts = self.attempts.read().map_err(poisoned)?;
        Ok(attempts
            .get(&(user_id.to_string(), source))
            .map(|rows| rows.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_preferences(&self, user_id: &str) -> Result<Option<RawRecord>> {
        let preferences = self.preferences.read().map_err(poisoned)?;
        Ok(preferences.get(user_id).cloned())
    }

    async fn fetch_candidates(&self, limit: u32) -> Result<Vec<RawRecord>> {
        let candidates = self.candidates.read().map_err(poisoned)?;
        Ok(candidates.iter().take(limit as usize * 2).cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
