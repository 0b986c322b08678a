use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Material,
    Quiz,
    Video,
    Article,
    Practice,
    #[serde(other)]
    Other,
}

/// A piece of content that can be offered to a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CandidateContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub subject: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
}

fn default_difficulty() -> String {
    super::attempt::DEFAULT_DIFFICULTY.to_string()
}

impl CandidateContent {
    pub fn new(subject: impl Into<String>, difficulty: impl Into<String>) -> Self {
        Self {
            id: None,
            title: None,
            subject: subject.into(),
            difficulty: difficulty.into(),
            topics: BTreeSet::new(),
            estimated_minutes: None,
            kind: None,
            word_count: None,
            question_count: None,
        }
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredContent {
    #[serde(flatten)]
    pub content: CandidateContent,
    pub score: f64,
    pub relevance_factors: Vec<String>,
}
