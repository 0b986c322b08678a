use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    analysis::{AggregateMetrics, TrendDirection},
    attempt::{AttemptRecord, Difficulty},
    content::{CandidateContent, ContentKind, ScoredContent},
    profile::{LearnerPreferences, LearnerProfile, LearningStyle},
};

pub const SUBJECT_MATCH_WEIGHT: f64 = 0.3;
pub const DIFFICULTY_MATCH_WEIGHT: f64 = 0.2;
pub const WEAK_AREA_WEIGHT: f64 = 0.2;
/// Added once per candidate topic that is also a weak area.
pub const WEAK_TOPIC_OVERLAP_WEIGHT: f64 = 0.1;
pub const TIME_FIT_WEIGHT: f64 = 0.1;
pub const LEARNING_STYLE_WEIGHT: f64 = 0.1;

pub const MAX_SCORE: f64 = 1.0;

const WORDS_PER_MINUTE: u32 = 200;
const MAX_READING_MINUTES: u32 = 60;
const MINUTES_PER_QUESTION: u32 = 2;
const DEFAULT_CONTENT_MINUTES: u32 = 15;
const INFERRED_FAVORITES: usize = 3;

/// Builds the per-request learner view from history and stored preferences.
pub fn build_profile(
    user_id: &str,
    records: &[AttemptRecord],
    metrics: &AggregateMetrics,
    direction: TrendDirection,
    preferences: &LearnerPreferences,
    recommended: Difficulty,
) -> LearnerProfile {
    let favorite_subjects = if preferences.favorite_subjects.is_empty() {
        most_practised_topics(records, INFERRED_FAVORITES)
    } else {
        preferences
            .favorite_subjects
            .iter()
            .map(|subject| normalize_label(subject))
            .filter(|subject| !subject.is_empty())
            .collect()
    };

    LearnerProfile {
        user_id: user_id.to_string(),
        learning_style: preferences.learning_style,
        preferred_difficulty: preferences.preferred_difficulty.unwrap_or(recommended),
        favorite_subjects,
        weak_areas: metrics.weaknesses.clone(),
        strong_areas: metrics.strengths.clone(),
        available_time_minutes: preferences.available_time_minutes,
        performance_trend: direction,
    }
}

fn most_practised_topics(records: &[AttemptRecord], limit: usize) -> BTreeSet<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.topic.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // BTreeMap order keeps ties alphabetical under the stable sort
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(limit)
        .map(|(topic, _)| topic.to_string())
        .collect()
}

/// Minutes a candidate is expected to take when it does not say.
pub fn estimate_minutes(candidate: &CandidateContent) -> u32 {
    if let Some(minutes) = candidate.estimated_minutes {
        return minutes;
    }
    match candidate.kind {
        Some(ContentKind::Material) => candidate
            .word_count
            .map(|words| (words / WORDS_PER_MINUTE).clamp(1, MAX_READING_MINUTES))
            .unwrap_or(DEFAULT_CONTENT_MINUTES),
        Some(ContentKind::Quiz) => candidate
            .question_count
            .map(|questions| (questions * MINUTES_PER_QUESTION).max(1))
            .unwrap_or(DEFAULT_CONTENT_MINUTES),
        _ => DEFAULT_CONTENT_MINUTES,
    }
}

/// Score in `[0, 1]` plus the human-readable reasons behind it.
pub fn score_candidate(
    profile: &LearnerProfile,
    candidate: &CandidateContent,
) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut factors = Vec::new();
    let subject = normalize_label(&candidate.subject);

    if profile.favorite_subjects.contains(&subject) {
        score += SUBJECT_MATCH_WEIGHT;
        factors.push(format!("Matches favorite subject {subject}"));
    }

    if Difficulty::parse(&candidate.difficulty) == Some(profile.preferred_difficulty) {
        score += DIFFICULTY_MATCH_WEIGHT;
        factors.push(format!(
            "Matches preferred {} difficulty",
            profile.preferred_difficulty
        ));
    }

    if profile.weak_areas.contains(&subject) {
        score += WEAK_AREA_WEIGHT;
        factors.push(format!("Targets weak area {subject}"));
    }

    let overlapping: BTreeSet<String> = candidate
        .topics
        .iter()
        .map(|topic| normalize_label(topic))
        .filter(|topic| profile.weak_areas.contains(topic))
        .collect();
    if !overlapping.is_empty() {
        score += WEAK_TOPIC_OVERLAP_WEIGHT * overlapping.len() as f64;
        let listed: Vec<&str> = overlapping.iter().map(String::as_str).collect();
        factors.push(format!("Covers weak topics: {}", listed.join(", ")));
    }

    if estimate_minutes(candidate) <= profile.available_time_minutes {
        score += TIME_FIT_WEIGHT;
        factors.push("Fits available study time".to_string());
    }

    if profile.learning_style == LearningStyle::Visual
        && candidate.kind == Some(ContentKind::Material)
    {
        score += LEARNING_STYLE_WEIGHT;
        factors.push("Suits visual learning style".to_string());
    }

    (score.min(MAX_SCORE), factors)
}

/// Ranks candidates best first; equal scores keep their input order.
pub fn rank(profile: &LearnerProfile, candidates: Vec<CandidateContent>) -> Vec<ScoredContent> {
    let mut scored: Vec<ScoredContent> = candidates
        .into_iter()
        .map(|mut content| {
            let (score, relevance_factors) = score_candidate(profile, &content);
            content.estimated_minutes = Some(estimate_minutes(&content));
            ScoredContent {
                content,
                score,
                relevance_factors,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

fn normalize_label(value: &str) -> String {
    value.trim().to_lowercase()
}
