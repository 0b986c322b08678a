use serde_json::{json, Value};

use crate::models::{
    analysis::{AggregateMetrics, AnalysisTask, TrendResult},
    attempt::{AttemptRecord, Difficulty},
};

/// Raw records included in a prompt; the rest of the history is summarised.
pub const RECENT_RECORDS_IN_PROMPT: usize = 5;

const DIFFICULTY_PROMPT: &str = "\
Analyze this student's learning performance and recommend the optimal difficulty level.
Respond with JSON only, in this shape:
{\"recommended_difficulty\": \"easy|medium|hard\", \"confidence\": 0.0-1.0, \
\"reasoning\": \"why\", \"recommendations\": [\"next step\", \"...\"]}";

const WEAKNESS_PROMPT: &str = "\
Identify the student's weak areas and the actions that would address them.
Respond with JSON only, in this shape:
{\"recommended_difficulty\": \"easy|medium|hard\", \"confidence\": 0.0-1.0, \
\"reasoning\": \"summary of the weaknesses\", \"recommendations\": [\"action\", \"...\"]}";

const LEARNING_PATH_PROMPT: &str = "\
Create a personalised learning path for the student and goal described below.
Respond with JSON only, in this shape:
{\"title\": \"...\", \"description\": \"...\", \"steps\": [{\"topic\": \"...\", \
\"difficulty\": \"easy|medium|hard\", \"estimated_minutes\": 30, \"activities\": [\"...\"]}]}";

const DOCUMENT_TOPICS_PROMPT: &str = "\
List the main topics covered by this document. Respond with a JSON array of strings only.";

const DOCUMENT_OBJECTIVES_PROMPT: &str = "\
List the learning objectives a student should reach after studying this document. \
Respond with a JSON array of strings only.";

const DOCUMENT_CONCEPTS_PROMPT: &str = "\
List the key concepts and terms introduced in this document. \
Respond with a JSON array of strings only.";

const DOCUMENT_RECOMMENDATIONS_PROMPT: &str = "\
Suggest study recommendations for a student working through this document. \
Respond with a JSON array of strings only.";

pub fn instruction(task: AnalysisTask) -> &'static str {
    match task {
        AnalysisTask::AdaptiveDifficulty => DIFFICULTY_PROMPT,
        AnalysisTask::WeaknessAnalysis => WEAKNESS_PROMPT,
        AnalysisTask::LearningPath => LEARNING_PATH_PROMPT,
        AnalysisTask::DocumentTopics => DOCUMENT_TOPICS_PROMPT,
        AnalysisTask::DocumentObjectives => DOCUMENT_OBJECTIVES_PROMPT,
        AnalysisTask::DocumentConcepts => DOCUMENT_CONCEPTS_PROMPT,
        AnalysisTask::DocumentRecommendations => DOCUMENT_RECOMMENDATIONS_PROMPT,
    }
}

/// Instruction followed by the JSON context block.
pub fn build_prompt(task: AnalysisTask, context: &Value) -> String {
    let rendered = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
    format!("{}\n\nContext:\n{}", instruction(task), rendered)
}

/// Compact summary handed to the model instead of the full history.
pub fn analysis_context(
    metrics: &AggregateMetrics,
    trend: &TrendResult,
    recent: &[AttemptRecord],
) -> Value {
    let recent: Vec<Value> = recent
        .iter()
        .take(RECENT_RECORDS_IN_PROMPT)
        .map(|record| {
            json!({
                "topic": record.topic,
                "difficulty": record.difficulty,
                "score": record.score,
                "total_questions": record.total_questions,
                "time_spent": record.time_spent,
            })
        })
        .collect();

    json!({
        "avg_score_pct": metrics.avg_score_pct.round(),
        "topic_scores": metrics.topic_scores,
        "difficulty_scores": metrics.difficulty_scores,
        "variance": metrics.variance,
        "time_efficiency": metrics.time_efficiency,
        "strengths": metrics.strengths,
        "weaknesses": metrics.weaknesses,
        "total_attempts": metrics.total_attempts,
        "trend": trend.direction,
        "patterns": trend.patterns,
        "recent_attempts": recent,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Object,
    StringArray,
}

/// Minimal structural contract a model reply must meet before it is used.
#[derive(Debug, Clone, Copy)]
pub struct OutputSchema {
    pub root: Root,
    pub required: &'static [&'static str],
    pub non_empty_arrays: &'static [&'static str],
    pub enums: &'static [(&'static str, &'static [&'static str])],
    /// `(array key, item key, allowed values)` checked on every array item.
    pub item_enums: &'static [(&'static str, &'static str, &'static [&'static str])],
}

const ANALYSIS_SCHEMA: OutputSchema = OutputSchema {
    root: Root::Object,
    required: &["recommended_difficulty"],
    non_empty_arrays: &[],
    enums: &[("recommended_difficulty", &Difficulty::ALL)],
    item_enums: &[],
};

const LEARNING_PATH_SCHEMA: OutputSchema = OutputSchema {
    root: Root::Object,
    required: &["title", "steps"],
    non_empty_arrays: &["steps"],
    enums: &[],
    item_enums: &[("steps", "difficulty", &Difficulty::ALL)],
};

const STRING_LIST_SCHEMA: OutputSchema = OutputSchema {
    root: Root::StringArray,
    required: &[],
    non_empty_arrays: &[],
    enums: &[],
    item_enums: &[],
};

impl OutputSchema {
    pub fn for_task(task: AnalysisTask) -> Self {
        match task {
            AnalysisTask::AdaptiveDifficulty | AnalysisTask::WeaknessAnalysis => ANALYSIS_SCHEMA,
            AnalysisTask::LearningPath => LEARNING_PATH_SCHEMA,
            AnalysisTask::DocumentTopics
            | AnalysisTask::DocumentObjectives
            | AnalysisTask::DocumentConcepts
            | AnalysisTask::DocumentRecommendations => STRING_LIST_SCHEMA,
        }
    }

    /// Returns a short description of the first violation found.
    pub fn validate(&self, payload: &Value) -> Result<(), String> {
        match self.root {
            Root::StringArray => {
                let items = payload.as_array().ok_or("expected a JSON array")?;
                if items.is_empty() {
                    return Err("array is empty".to_string());
                }
                if !items.iter().all(Value::is_string) {
                    return Err("array items must be strings".to_string());
                }
                Ok(())
            }
            Root::Object => {
                let object = payload.as_object().ok_or("expected a JSON object")?;

                for key in self.required {
                    match object.get(*key) {
                        None | Some(Value::Null) => return Err(format!("missing `{key}`")),
                        _ => {}
                    }
                }

                for key in self.non_empty_arrays {
                    let non_empty = object
                        .get(*key)
                        .and_then(Value::as_array)
                        .is_some_and(|items| !items.is_empty());
                    if !non_empty {
                        return Err(format!("`{key}` must be a non-empty array"));
                    }
                }

                for (key, allowed) in self.enums {
                    if let Some(value) = object.get(*key) {
                        check_enum(key, value, allowed)?;
                    }
                }

                for (array_key, item_key, allowed) in self.item_enums {
                    let items = object
                        .get(*array_key)
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    for item in items {
                        if let Some(value) = item.get(*item_key) {
                            check_enum(item_key, value, allowed)?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

fn check_enum(key: &str, value: &Value, allowed: &[&str]) -> Result<(), String> {
    let label = value
        .as_str()
        .map(|s| s.trim().to_ascii_lowercase())
        .ok_or_else(|| format!("`{key}` must be a string"))?;
    if allowed.contains(&label.as_str()) {
        Ok(())
    } else {
        Err(format!("`{key}` has unexpected value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{aggregator, trend};
    use crate::models::attempt::RecordSource;

    #[test]
    fn test_analysis_schema() {
        let schema = OutputSchema::for_task(AnalysisTask::AdaptiveDifficulty);
        assert!(schema
            .validate(&json!({"recommended_difficulty": "Hard", "confidence": 0.9}))
            .is_ok());
        assert!(schema.validate(&json!({"confidence": 0.9})).is_err());
        assert!(schema
            .validate(&json!({"recommended_difficulty": "expert"}))
            .is_err());
        assert!(schema.validate(&json!(["hard"])).is_err());
    }

    #[test]
    fn test_learning_path_schema_checks_steps() {
        let schema = OutputSchema::for_task(AnalysisTask::LearningPath);
        let valid = json!({"title": "Algebra", "steps": [{"topic": "x", "difficulty": "easy"}]});
        assert!(schema.validate(&valid).is_ok());

        let empty = json!({"title": "Algebra", "steps": []});
        assert!(schema.validate(&empty).is_err());

        let bad_level = json!({
            "title": "Algebra",
            "steps": [{"topic": "x", "difficulty": "insane"}]
        });
        assert!(schema.validate(&bad_level).is_err());
    }

    #[test]
    fn test_string_list_schema() {
        let schema = OutputSchema::for_task(AnalysisTask::DocumentTopics);
        assert!(schema.validate(&json!(["energy", "grids"])).is_ok());
        assert!(schema.validate(&json!([])).is_err());
        assert!(schema.validate(&json!([1, 2])).is_err());
        assert!(schema.validate(&json!({"topics": ["x"]})).is_err());
    }

    #[test]
    fn test_context_is_bounded() {
        let records: Vec<AttemptRecord> = (0..20)
            .map(|i| AttemptRecord {
                user_id: "u1".into(),
                topic: format!("topic-{i}"),
                difficulty: "easy".into(),
                score: 1,
                total_questions: 2,
                time_spent: 10,
                created_at: None,
                source: RecordSource::Performance,
            })
            .collect();
        let metrics = aggregator::aggregate(&records);
        let trend = trend::analyze_trend(&records);

        let context = analysis_context(&metrics, &trend, &records);
        assert_eq!(
            context["recent_attempts"].as_array().map(Vec::len),
            Some(RECENT_RECORDS_IN_PROMPT)
        );

        let prompt = build_prompt(AnalysisTask::AdaptiveDifficulty, &context);
        assert!(prompt.starts_with(DIFFICULTY_PROMPT));
        assert!(!prompt.contains("u1"));
    }
}
