use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::analysis::TrendDirection;
use super::attempt::Difficulty;

pub const DEFAULT_AVAILABLE_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
    #[default]
    #[serde(other)]
    Mixed,
}

impl LearningStyle {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "visual" => LearningStyle::Visual,
            "auditory" => LearningStyle::Auditory,
            "kinesthetic" => LearningStyle::Kinesthetic,
            "reading" | "reading_writing" => LearningStyle::Reading,
            _ => LearningStyle::Mixed,
        }
    }
}

/// Stored, optional learner preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerPreferences {
    #[serde(default)]
    pub learning_style: LearningStyle,
    pub preferred_difficulty: Option<Difficulty>,
    #[serde(default)]
    pub favorite_subjects: Vec<String>,
    #[serde(default = "default_available_minutes")]
    pub available_time_minutes: u32,
}

impl Default for LearnerPreferences {
    fn default() -> Self {
        Self {
            learning_style: LearningStyle::default(),
            preferred_difficulty: None,
            favorite_subjects: Vec::new(),
            available_time_minutes: DEFAULT_AVAILABLE_MINUTES,
        }
    }
}

fn default_available_minutes() -> u32 {
    DEFAULT_AVAILABLE_MINUTES
}

/// Per-request learner view derived from attempts plus preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub user_id: String,
    pub learning_style: LearningStyle,
    pub preferred_difficulty: Difficulty,
    pub favorite_subjects: BTreeSet<String>,
    pub weak_areas: BTreeSet<String>,
    pub strong_areas: BTreeSet<String>,
    pub available_time_minutes: u32,
    pub performance_trend: TrendDirection,
}

impl LearnerProfile {
    /// Bare profile with no history; mostly useful for callers building one by hand.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            learning_style: LearningStyle::Mixed,
            preferred_difficulty: Difficulty::Medium,
            favorite_subjects: BTreeSet::new(),
            weak_areas: BTreeSet::new(),
            strong_areas: BTreeSet::new(),
            available_time_minutes: DEFAULT_AVAILABLE_MINUTES,
            performance_trend: TrendDirection::Stable,
        }
    }
}
