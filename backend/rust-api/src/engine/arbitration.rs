use std::collections::BTreeMap;

use serde_json::Value;

use crate::metrics;
use crate::models::{
    analysis::{
        AggregateMetrics, AnalysisResult, AnalysisTask, PatternKind, Provenance, TrendDirection,
        TrendResult,
    },
    attempt::Difficulty,
};

use super::orchestrator::{AiOutcome, FailureReason};
use super::prompts::OutputSchema;

/// Used when a valid AI payload carries no usable confidence.
pub const DEFAULT_AI_CONFIDENCE: f64 = 0.7;

/// Fallback confidence ceiling when the learner has no history.
pub const NO_HISTORY_CONFIDENCE_CAP: f64 = 0.5;

pub const HARD_THRESHOLD: f64 = 90.0;
pub const MEDIUM_THRESHOLD: f64 = 75.0;

/// Recommendation derived purely from statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalVerdict {
    pub difficulty: Difficulty,
    pub confidence: f64,
    pub reasoning: String,
    pub recommendations: Vec<String>,
}

pub fn difficulty_for_score(avg_score_pct: f64) -> (Difficulty, f64) {
    if avg_score_pct >= HARD_THRESHOLD {
        (Difficulty::Hard, 0.8)
    } else if avg_score_pct >= MEDIUM_THRESHOLD {
        (Difficulty::Medium, 0.7)
    } else {
        (Difficulty::Easy, 0.6)
    }
}

pub fn statistical_verdict(metrics: &AggregateMetrics, trend: &TrendResult) -> StatisticalVerdict {
    let (difficulty, mut confidence) = difficulty_for_score(metrics.avg_score_pct);
    if !metrics.has_data() {
        confidence = confidence.min(NO_HISTORY_CONFIDENCE_CAP);
    }

    let reasoning = if metrics.has_data() {
        format!(
            "Based on an average score of {}% over {} attempts with a {} trend.",
            metrics.avg_score_pct.round(),
            metrics.total_attempts,
            trend.direction.as_str()
        )
    } else {
        format!("No attempt history yet; starting at {difficulty} difficulty.")
    };

    StatisticalVerdict {
        difficulty,
        confidence,
        reasoning,
        recommendations: fallback_recommendations(metrics, trend, difficulty),
    }
}

fn fallback_recommendations(
    metrics: &AggregateMetrics,
    trend: &TrendResult,
    difficulty: Difficulty,
) -> Vec<String> {
    let mut recommendations: Vec<String> = metrics
        .weaknesses
        .iter()
        .map(|topic| format!("Review the fundamentals of {topic} with easier exercises"))
        .collect();

    if trend.has_pattern(PatternKind::ConsistentLowPerformance) {
        recommendations.push("Slow down and focus on core concepts before new material".into());
    }
    if trend.direction == TrendDirection::Declining {
        recommendations.push("Revisit recently covered material before moving on".into());
    }
    if trend.has_pattern(PatternKind::InconsistentPerformance) {
        recommendations.push("Practice in shorter, regular sessions to stabilise results".into());
    }
    if let Some(topic) = metrics.strengths.iter().next() {
        recommendations.push(format!("Take on harder challenges in {topic}"));
    }
    recommendations.push(format!("Continue with {difficulty} difficulty"));

    recommendations
}

/// Picks the AI payload when it passes the task schema, else the statistics.
pub fn arbitrate_analysis(
    task: AnalysisTask,
    outcome: &AiOutcome,
    metrics: &AggregateMetrics,
    trend: &TrendResult,
) -> AnalysisResult {
    let verdict = statistical_verdict(metrics, trend);

    let (difficulty, confidence, reasoning, recommendations, provenance) =
        match validated_payload(task, outcome).and_then(|payload| read_ai_fields(&payload)) {
            // missing text fields are filled from the statistics
            Some(ai) => (
                ai.difficulty,
                ai.confidence,
                ai.reasoning.unwrap_or(verdict.reasoning),
                ai.recommendations.unwrap_or(verdict.recommendations),
                Provenance::Ai,
            ),
            None => (
                verdict.difficulty,
                verdict.confidence,
                verdict.reasoning,
                verdict.recommendations,
                Provenance::Fallback,
            ),
        };

    metrics::record_analysis_result(task.as_str(), provenance.as_str());

    AnalysisResult {
        avg_score_pct: round_pct(metrics.avg_score_pct),
        topic_scores: round_map(&metrics.topic_scores),
        difficulty_scores: round_map(&metrics.difficulty_scores),
        variance: metrics.variance,
        time_efficiency: metrics.time_efficiency,
        consistency: metrics.consistency,
        strengths: metrics.strengths.clone(),
        weaknesses: metrics.weaknesses.clone(),
        total_attempts: metrics.total_attempts,
        direction: trend.direction,
        patterns: trend.patterns.clone(),
        recommended_difficulty: difficulty,
        confidence,
        reasoning,
        provenance,
        recommendations,
    }
}

/// Generic arbitration for tasks whose payload maps onto a caller type.
///
/// `parse` runs only on schema-valid payloads; `None` from it falls back too.
pub fn select<T>(
    task: AnalysisTask,
    outcome: &AiOutcome,
    parse: impl FnOnce(&Value) -> Option<T>,
    fallback: impl FnOnce() -> T,
) -> (T, Provenance) {
    let chosen = validated_payload(task, outcome)
        .and_then(|payload| parse(&payload))
        .map(|value| (value, Provenance::Ai))
        .unwrap_or_else(|| (fallback(), Provenance::Fallback));

    metrics::record_analysis_result(task.as_str(), chosen.1.as_str());
    chosen
}

fn validated_payload(task: AnalysisTask, outcome: &AiOutcome) -> Option<Value> {
    let payload = outcome.payload()?;
    match OutputSchema::for_task(task).validate(payload) {
        Ok(()) => Some(payload.clone()),
        Err(detail) => {
            let reason = FailureReason::SchemaViolation(detail);
            tracing::warn!(
                task = task.as_str(),
                failure = reason.kind(),
                error = %reason,
                "discarding AI payload"
            );
            None
        }
    }
}

struct AiFields {
    difficulty: Difficulty,
    confidence: f64,
    reasoning: Option<String>,
    recommendations: Option<Vec<String>>,
}

fn read_ai_fields(payload: &Value) -> Option<AiFields> {
    let difficulty = payload
        .get("recommended_difficulty")
        .and_then(Value::as_str)
        .and_then(Difficulty::parse)?;

    let confidence = payload
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| (0.0..=1.0).contains(c))
        .unwrap_or(DEFAULT_AI_CONFIDENCE);

    let reasoning = payload
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    let recommendations = payload
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| string_items(items))
        .filter(|items| !items.is_empty());

    Some(AiFields {
        difficulty,
        confidence,
        reasoning,
        recommendations,
    })
}

/// Non-empty trimmed strings from a JSON array; other items are skipped.
pub fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn round_pct(value: f64) -> u32 {
    value.clamp(0.0, 100.0).round() as u32
}

fn round_map(map: &BTreeMap<String, f64>) -> BTreeMap<String, u32> {
    map.iter()
        .map(|(key, value)| (key.clone(), round_pct(*value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::orchestrator::CallAttempt;
    use crate::engine::{aggregator, trend};
    use crate::models::attempt::{AttemptRecord, RecordSource};
    use serde_json::json;
    use std::time::Duration;

    fn records(scores: &[(&str, u32, u32)]) -> Vec<AttemptRecord> {
        scores
            .iter()
            .map(|(topic, score, total)| AttemptRecord {
                user_id: "u1".into(),
                topic: (*topic).into(),
                difficulty: "medium".into(),
                score: *score,
                total_questions: *total,
                time_spent: 60,
                created_at: None,
                source: RecordSource::Performance,
            })
            .collect()
    }

    fn exhausted() -> AiOutcome {
        AiOutcome::Exhausted {
            reason: FailureReason::Network("down".into()),
            attempts: vec![CallAttempt {
                slot: 0,
                elapsed: Duration::from_millis(5),
                failure: Some(FailureReason::Network("down".into())),
            }],
        }
    }

    fn success(payload: Value) -> AiOutcome {
        AiOutcome::Success {
            payload,
            attempts: vec![CallAttempt {
                slot: 0,
                elapsed: Duration::from_millis(5),
                failure: None,
            }],
        }
    }

    fn analyse(input: &[AttemptRecord], outcome: &AiOutcome) -> AnalysisResult {
        let metrics = aggregator::aggregate(input);
        let trend = trend::analyze_trend(input);
        arbitrate_analysis(AnalysisTask::AdaptiveDifficulty, outcome, &metrics, &trend)
    }

    #[test]
    fn test_exhausted_high_scorer_gets_hard() {
        // 23/25 = 92%
        let input = records(&[("math", 23, 25)]);
        let result = analyse(&input, &exhausted());

        assert_eq!(result.avg_score_pct, 92);
        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.recommended_difficulty, Difficulty::Hard);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_fallback_thresholds() {
        assert_eq!(difficulty_for_score(90.0), (Difficulty::Hard, 0.8));
        assert_eq!(difficulty_for_score(75.0), (Difficulty::Medium, 0.7));
        assert_eq!(difficulty_for_score(74.9), (Difficulty::Easy, 0.6));
    }

    #[test]
    fn test_no_history_is_fully_populated_with_reduced_confidence() {
        let result = analyse(&[], &exhausted());

        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.avg_score_pct, 75);
        assert_eq!(result.recommended_difficulty, Difficulty::Medium);
        assert!(result.confidence <= 0.6);
        assert!(!result.reasoning.is_empty());
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_valid_ai_payload_is_used() {
        let input = records(&[("math", 3, 10)]);
        let payload = json!({
            "recommended_difficulty": "medium",
            "confidence": 0.95,
            "reasoning": "Steady progress",
            "recommendations": ["Practice fractions"]
        });
        let result = analyse(&input, &success(payload));

        assert_eq!(result.provenance, Provenance::Ai);
        assert_eq!(result.recommended_difficulty, Difficulty::Medium);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.reasoning, "Steady progress");
        assert_eq!(result.recommendations, vec!["Practice fractions".to_string()]);
        // statistics are never replaced by the model
        assert_eq!(result.avg_score_pct, 30);
    }

    #[test]
    fn test_out_of_range_confidence_defaults() {
        let input = records(&[("math", 8, 10)]);
        let payload = json!({
            "recommended_difficulty": "hard",
            "confidence": 7,
            "reasoning": "ok",
            "recommendations": ["x"]
        });
        let result = analyse(&input, &success(payload));

        assert_eq!(result.provenance, Provenance::Ai);
        assert_eq!(result.confidence, DEFAULT_AI_CONFIDENCE);
    }

    #[test]
    fn test_schema_valid_payload_without_text_stays_ai() {
        let input = records(&[("math", 8, 10)]);
        let payload = json!({"recommended_difficulty": "easy", "confidence": 0.9});
        let result = analyse(&input, &success(payload));

        assert_eq!(result.provenance, Provenance::Ai);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.recommended_difficulty, Difficulty::Easy);
        assert!(result.reasoning.contains("80%"));
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_schema_violation_falls_back() {
        let input = records(&[("math", 19, 20)]);
        let payload = json!({"recommended_difficulty": "expert", "confidence": 0.9});
        let result = analyse(&input, &success(payload));

        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.recommended_difficulty, Difficulty::Hard);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_fallback_recommendations_mention_weak_topics() {
        let input = records(&[("history", 2, 10), ("math", 9, 10), ("history", 3, 10)]);
        let result = analyse(&input, &exhausted());

        assert!(result
            .recommendations
            .iter()
            .any(|line| line.contains("history")));
        assert!(result.recommendations.iter().any(|line| line.contains("math")));
    }

    #[test]
    fn test_select_uses_parser_or_fallback() {
        let ok = success(json!(["energy", "grids"]));
        let (topics, provenance) = select(
            AnalysisTask::DocumentTopics,
            &ok,
            |payload| payload.as_array().map(|items| string_items(items)),
            Vec::new,
        );
        assert_eq!(provenance, Provenance::Ai);
        assert_eq!(topics, vec!["energy".to_string(), "grids".to_string()]);

        let (topics, provenance) = select(
            AnalysisTask::DocumentTopics,
            &exhausted(),
            |payload| payload.as_array().map(|items| string_items(items)),
            || vec!["general".to_string()],
        );
        assert_eq!(provenance, Provenance::Fallback);
        assert_eq!(topics, vec!["general".to_string()]);
    }

    #[test]
    fn test_analysis_result_json_round_trip() {
        let input = records(&[("math", 7, 9), ("art", 1, 3), ("math", 5, 7)]);
        let result = analyse(&input, &exhausted());

        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: AnalysisResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, result);

        let value: Value = serde_json::from_str(&encoded).unwrap();
        for key in [
            "avg_score_pct",
            "topic_scores",
            "difficulty_scores",
            "variance",
            "time_efficiency",
            "strengths",
            "weaknesses",
            "direction",
            "patterns",
            "recommended_difficulty",
            "confidence",
            "reasoning",
            "provenance",
            "recommendations",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["provenance"], "fallback");
    }
}
