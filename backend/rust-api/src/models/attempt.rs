use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Loosely-typed row as it comes out of the datastore.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_TOPIC: &str = "general";
pub const DEFAULT_DIFFICULTY: &str = "medium";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Performance,
    QuizAttempts,
}

impl RecordSource {
    /// Collection/table the records are read from.
    pub fn collection(&self) -> &'static str {
        match self {
            RecordSource::Performance => "performance",
            RecordSource::QuizAttempts => "quiz_attempts",
        }
    }
}

/// One scored exercise instance after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub user_id: String,
    pub topic: String,
    pub difficulty: String,
    pub score: u32,
    pub total_questions: u32,
    pub time_spent: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub source: RecordSource,
}

impl AttemptRecord {
    /// Per-record percentage score, always within 0..=100.
    pub fn score_pct(&self) -> f64 {
        let total = self.total_questions.max(1) as f64;
        (self.score.min(self.total_questions) as f64 / total) * 100.0
    }
}

/// Strict difficulty scale used for recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [&'static str; 3] = ["easy", "medium", "hard"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Difficulty::Easy => Some(Difficulty::Medium),
            Difficulty::Medium => Some(Difficulty::Hard),
            Difficulty::Hard => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
