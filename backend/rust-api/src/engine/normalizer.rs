//! Turns loosely-typed datastore rows into uniform [`AttemptRecord`]s.
//!
//! Nothing in here fails: missing or malformed fields degrade to defaults.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{
    attempt::{
        AttemptRecord, Difficulty, RawRecord, RecordSource, DEFAULT_DIFFICULTY, DEFAULT_TOPIC,
    },
    content::{CandidateContent, ContentKind},
    profile::{LearnerPreferences, LearningStyle, DEFAULT_AVAILABLE_MINUTES},
};

const SCORE_KEYS: &[&str] = &["score", "correct_answers"];
const TOTAL_KEYS: &[&str] = &["total_questions", "questions_count", "question_count"];
const TOPIC_KEYS: &[&str] = &["topic", "subject", "topic_name"];
const DIFFICULTY_KEYS: &[&str] = &["difficulty", "difficulty_level"];
const TIME_KEYS: &[&str] = &["time_spent", "time_taken", "duration_seconds"];
const CREATED_AT_KEYS: &[&str] = &["created_at", "completed_at"];

pub fn normalize_records(
    user_id: &str,
    source: RecordSource,
    raw: &[RawRecord],
) -> Vec<AttemptRecord> {
    raw.iter()
        .map(|record| normalize_record(user_id, source, record))
        .collect()
}

pub fn normalize_record(user_id: &str, source: RecordSource, raw: &RawRecord) -> AttemptRecord {
    let total_questions = match first_number(raw, TOTAL_KEYS).map(to_u32) {
        Some(0) | None => 1,
        Some(total) => total,
    };

    let mut score = first_number(raw, SCORE_KEYS).map(to_u32).unwrap_or(0);
    if score > total_questions {
        tracing::debug!(
            score,
            total_questions,
            source = source.collection(),
            "Clamping score above total_questions"
        );
        score = total_questions;
    }

    let user_id = raw
        .get("user_id")
        .and_then(value_to_label)
        .unwrap_or_else(|| user_id.to_string());

    AttemptRecord {
        user_id,
        topic: first_label(raw, TOPIC_KEYS).unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        difficulty: first_label(raw, DIFFICULTY_KEYS)
            .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
        score,
        total_questions,
        time_spent: first_number(raw, TIME_KEYS).map(to_u64).unwrap_or(0),
        created_at: CREATED_AT_KEYS
            .iter()
            .find_map(|key| raw.get(*key).and_then(parse_timestamp)),
        source,
    }
}

/// Merges both attempt sources, most recent first.
///
/// Records without a timestamp keep their relative order after the dated ones.
pub fn merge_sources(
    mut performance: Vec<AttemptRecord>,
    quiz_attempts: Vec<AttemptRecord>,
) -> Vec<AttemptRecord> {
    performance.extend(quiz_attempts);
    performance.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    performance
}

pub fn normalize_preferences(raw: Option<&RawRecord>) -> LearnerPreferences {
    let Some(raw) = raw else {
        return LearnerPreferences::default();
    };

    let favorite_subjects = raw
        .get("favorite_subjects")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(value_to_label).collect())
        .unwrap_or_default();

    let available_time_minutes = first_number(raw, &["available_time_minutes", "available_time"])
        .map(to_u32)
        .filter(|minutes| *minutes > 0)
        .unwrap_or(DEFAULT_AVAILABLE_MINUTES);

    LearnerPreferences {
        learning_style: raw
            .get("learning_style")
            .and_then(Value::as_str)
            .map(LearningStyle::parse)
            .unwrap_or_default(),
        preferred_difficulty: raw
            .get("preferred_difficulty")
            .and_then(Value::as_str)
            .and_then(Difficulty::parse),
        favorite_subjects,
        available_time_minutes,
    }
}

/// Builds a scoring candidate from a `study_materials` or `quizzes` row.
pub fn normalize_candidate(raw: &RawRecord) -> CandidateContent {
    let id = raw.get("id").or_else(|| raw.get("_id")).and_then(value_to_text);

    if let Some(analysis) = raw.get("ai_analysis").and_then(Value::as_object) {
        let mut candidate = CandidateContent::new(
            first_label(analysis, &["subject_category"])
                .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            first_label(analysis, &["difficulty_level"])
                .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
        )
        .with_kind(ContentKind::Material);
        candidate.id = id;
        candidate.title = raw.get("filename").and_then(value_to_text);
        candidate.topics = string_list(analysis.get("key_topics"));
        candidate.word_count = first_number(raw, &["word_count"]).map(to_u32);
        return candidate;
    }

    let topic = first_label(raw, TOPIC_KEYS).unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let mut candidate = CandidateContent::new(
        topic.clone(),
        first_label(raw, DIFFICULTY_KEYS).unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
    )
    .with_kind(ContentKind::Quiz)
    .with_topics([topic]);
    candidate.id = id;
    candidate.title = raw.get("title").and_then(value_to_text);
    candidate.question_count = raw
        .get("questions")
        .and_then(Value::as_array)
        .map(|questions| questions.len() as u32)
        .or_else(|| first_number(raw, &["question_count"]).map(to_u32));
    candidate
}

fn first_number(raw: &RawRecord, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| raw.get(*key).and_then(value_to_number))
}

fn first_label(raw: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| raw.get(*key).and_then(value_to_label))
}

fn value_to_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Object(map) => map
            .get("$numberInt")
            .or_else(|| map.get("$numberLong"))
            .or_else(|| map.get("$numberDouble"))
            .and_then(value_to_number),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Trimmed, lower-cased label; empty strings count as missing.
fn value_to_label(value: &Value) -> Option<String> {
    value_to_text(value)
        .map(|text| text.trim().to_lowercase())
        .filter(|text| !text.is_empty())
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> std::collections::BTreeSet<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(value_to_label).collect())
        .unwrap_or_default()
}

fn to_u32(value: f64) -> u32 {
    value.round().clamp(0.0, u32::MAX as f64) as u32
}

fn to_u64(value: f64) -> u64 {
    value.round().clamp(0.0, u64::MAX as f64) as u64
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::Object(map) => map.get("$date").and_then(|inner| match inner {
            Value::Object(_) => value_to_number(inner)
                .and_then(|millis| Utc.timestamp_millis_opt(millis as i64).single()),
            other => parse_timestamp(other),
        }),
        _ => None,
    }
}
