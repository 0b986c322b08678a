use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::models::document::DocumentSummary;

use super::arbitration::string_items;

/// Characters of document content that enter a prompt.
pub const CONTENT_PROMPT_LIMIT: usize = 2000;

const MAX_FALLBACK_OBJECTIVES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    SmartCity,
    Energy,
    Calculus,
    History,
    Generic,
}

impl Theme {
    fn detect(content: &str) -> Self {
        let words: BTreeSet<String> = content
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect();
        let has = |word: &str| words.contains(word);

        if has("smart") && (has("city") || has("cities")) {
            Theme::SmartCity
        } else if has("energy") {
            Theme::Energy
        } else if has("calculus") || has("derivative") || has("derivatives") {
            Theme::Calculus
        } else if has("war") || has("history") {
            Theme::History
        } else {
            Theme::Generic
        }
    }

    fn topics(&self) -> [&'static str; 4] {
        match self {
            Theme::SmartCity => [
                "Smart Cities",
                "Urban Development",
                "Technology Integration",
                "Sustainable Development",
            ],
            Theme::Energy => [
                "Energy Systems",
                "Renewable Energy",
                "Energy Efficiency",
                "Power Generation",
            ],
            Theme::Calculus => [
                "Calculus",
                "Derivatives",
                "Integration",
                "Mathematical Analysis",
            ],
            Theme::History => [
                "Historical Events",
                "War Analysis",
                "Political Context",
                "Social Impact",
            ],
            Theme::Generic => ["Main Concepts", "Key Ideas", "Important Points", "Core Topics"],
        }
    }

    fn concepts(&self) -> [&'static str; 4] {
        match self {
            Theme::SmartCity => [
                "Smart City Infrastructure",
                "IoT Integration",
                "Data Analytics",
                "Sustainable Development",
            ],
            Theme::Energy => [
                "Energy Systems",
                "Renewable Resources",
                "Energy Efficiency",
                "Power Distribution",
            ],
            Theme::Calculus => ["Derivatives", "Integration", "Limits", "Rate of Change"],
            Theme::History => [
                "Historical Context",
                "Political Factors",
                "Social Impact",
                "Economic Consequences",
            ],
            Theme::Generic => [
                "Core Principles",
                "Fundamental Concepts",
                "Key Ideas",
                "Main Principles",
            ],
        }
    }
}

/// Truncates on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn document_context(summary: &DocumentSummary) -> Value {
    json!({
        "filename": summary.filename,
        "content": truncate_chars(&summary.content, CONTENT_PROMPT_LIMIT),
        "known_topics": summary.topics,
        "known_concepts": summary.concepts,
    })
}

/// Parses a schema-valid string-array reply.
pub fn parse_string_list(payload: &Value) -> Option<Vec<String>> {
    let items = string_items(payload.as_array()?);
    (!items.is_empty()).then_some(items)
}

pub fn fallback_topics(summary: &DocumentSummary) -> Vec<String> {
    provided_or(&summary.topics, || {
        Theme::detect(&summary.content)
            .topics()
            .iter()
            .map(|topic| topic.to_string())
            .collect()
    })
}

pub fn fallback_concepts(summary: &DocumentSummary) -> Vec<String> {
    provided_or(&summary.concepts, || {
        Theme::detect(&summary.content)
            .concepts()
            .iter()
            .map(|concept| concept.to_string())
            .collect()
    })
}

pub fn fallback_objectives(topics: &[String]) -> Vec<String> {
    let mut objectives: Vec<String> = topics
        .iter()
        .take(MAX_FALLBACK_OBJECTIVES)
        .map(|topic| format!("Understand the key ideas of {topic}"))
        .collect();
    if let Some(first) = topics.first() {
        objectives.push(format!("Apply {first} to practical problems"));
    }
    objectives
}

pub fn fallback_recommendations(topics: &[String]) -> Vec<String> {
    let mut recommendations = vec![
        "Read through the material systematically and take detailed notes".to_string(),
    ];
    if !topics.is_empty() {
        recommendations.push(format!(
            "Create a concept map linking {}",
            topics.join(", ")
        ));
    }
    recommendations.push("Practice with real-world examples and case studies".to_string());
    recommendations.push("Review and test your understanding with practice questions".to_string());
    recommendations
}

fn provided_or(provided: &[String], fallback: impl FnOnce() -> Vec<String>) -> Vec<String> {
    let cleaned: Vec<String> = provided
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if cleaned.is_empty() {
        fallback()
    } else {
        cleaned
    }
}
