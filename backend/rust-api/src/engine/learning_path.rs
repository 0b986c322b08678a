use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::models::{
    analysis::{AggregateMetrics, Provenance},
    attempt::{Difficulty, DEFAULT_TOPIC},
    learning_path::{LearningPath, PathStep},
    profile::LearnerProfile,
};

use super::arbitration::{string_items, DEFAULT_AI_CONFIDENCE};

pub const MAX_TEMPLATE_STEPS: usize = 6;
pub const TEMPLATE_STEP_MINUTES: u32 = 30;
pub const TEMPLATE_CONFIDENCE: f64 = 0.6;

const MAX_STEP_MINUTES: u64 = 240;

/// What the learner asked the path to achieve.
#[derive(Debug, Clone, PartialEq)]
pub struct PathGoal {
    pub goal: String,
    pub time_available_days: u32,
    pub focus_areas: Vec<String>,
}

pub fn path_context(
    profile: &LearnerProfile,
    metrics: &AggregateMetrics,
    goal: &PathGoal,
) -> Value {
    json!({
        "goal": goal.goal,
        "time_available_days": goal.time_available_days,
        "focus_areas": goal.focus_areas,
        "current_level": profile.preferred_difficulty,
        "learning_style": profile.learning_style,
        "available_minutes_per_day": profile.available_time_minutes,
        "avg_score_pct": metrics.avg_score_pct.round(),
        "strengths": profile.strong_areas,
        "weaknesses": profile.weak_areas,
        "trend": profile.performance_trend,
    })
}

/// Reads a schema-valid model reply into a path.
pub fn parse_ai_path(payload: &Value, goal: &PathGoal) -> Option<LearningPath> {
    let title = payload.get("title").and_then(Value::as_str)?.trim();
    if title.is_empty() {
        return None;
    }

    let steps: Vec<PathStep> = payload
        .get("steps")
        .and_then(Value::as_array)?
        .iter()
        .enumerate()
        .map(|(idx, step)| PathStep {
            order: idx as u32 + 1,
            topic: step
                .get("topic")
                .and_then(Value::as_str)
                .map(|topic| topic.trim().to_string())
                .filter(|topic| !topic.is_empty())
                .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            difficulty: step
                .get("difficulty")
                .and_then(Value::as_str)
                .and_then(Difficulty::parse)
                .unwrap_or(Difficulty::Medium),
            estimated_minutes: step
                .get("estimated_minutes")
                .and_then(Value::as_u64)
                .map(|minutes| minutes.clamp(1, MAX_STEP_MINUTES) as u32)
                .unwrap_or(TEMPLATE_STEP_MINUTES),
            activities: step
                .get("activities")
                .and_then(Value::as_array)
                .map(|items| string_items(items))
                .unwrap_or_default(),
        })
        .collect();

    if steps.is_empty() {
        return None;
    }

    Some(LearningPath {
        title: title.to_string(),
        description: payload
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default_description(goal)),
        goal: goal.goal.clone(),
        time_available_days: goal.time_available_days,
        steps,
        provenance: Provenance::Ai,
        confidence: payload
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| (0.0..=1.0).contains(c))
            .unwrap_or(DEFAULT_AI_CONFIDENCE),
    })
}

/// Deterministic path: focus areas, then weaknesses, developing topics and strengths.
pub fn template_path(
    profile: &LearnerProfile,
    metrics: &AggregateMetrics,
    goal: &PathGoal,
) -> LearningPath {
    let mut seen = BTreeSet::new();
    let mut planned: Vec<(String, Difficulty)> = Vec::new();

    let focus = goal
        .focus_areas
        .iter()
        .map(|area| (area.trim().to_lowercase(), Difficulty::Easy));
    let weak = metrics
        .weaknesses
        .iter()
        .map(|topic| (topic.clone(), Difficulty::Easy));
    let developing = metrics
        .developing_topics()
        .into_iter()
        .map(|topic| (topic, Difficulty::Medium));
    let strong = metrics
        .strengths
        .iter()
        .map(|topic| (topic.clone(), profile.preferred_difficulty));

    for (topic, difficulty) in focus.chain(weak).chain(developing).chain(strong) {
        if planned.len() == MAX_TEMPLATE_STEPS {
            break;
        }
        if topic.is_empty() || !seen.insert(topic.clone()) {
            continue;
        }
        planned.push((topic, difficulty));
    }

    if planned.is_empty() {
        planned.push((DEFAULT_TOPIC.to_string(), Difficulty::Easy));
    }

    let steps = planned
        .into_iter()
        .enumerate()
        .map(|(idx, (topic, difficulty))| PathStep {
            order: idx as u32 + 1,
            activities: template_activities(difficulty),
            topic,
            difficulty,
            estimated_minutes: TEMPLATE_STEP_MINUTES,
        })
        .collect();

    LearningPath {
        title: format!("Personalized Learning Path for {}", goal.goal),
        description: default_description(goal),
        goal: goal.goal.clone(),
        time_available_days: goal.time_available_days,
        steps,
        provenance: Provenance::Fallback,
        confidence: TEMPLATE_CONFIDENCE,
    }
}

fn default_description(goal: &PathGoal) -> String {
    format!(
        "A {}-day learning journey tailored to your needs",
        goal.time_available_days
    )
}

fn template_activities(difficulty: Difficulty) -> Vec<String> {
    let items: &[&str] = match difficulty {
        Difficulty::Easy => &["Review core concepts", "Complete a short practice quiz"],
        Difficulty::Medium => &["Work through guided exercises", "Take a mixed-topic quiz"],
        Difficulty::Hard => &[
            "Attempt challenge problems",
            "Explain the key ideas in your own words",
        ],
    };
    items.iter().map(|item| item.to_string()).collect()
}
