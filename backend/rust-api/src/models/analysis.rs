use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::attempt::Difficulty;

/// Statistical summary of a learner's attempt history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub avg_score_pct: f64,
    pub topic_scores: BTreeMap<String, f64>,
    pub difficulty_scores: BTreeMap<String, f64>,
    pub variance: f64,
    pub time_efficiency: f64,
    pub consistency: f64,
    pub strengths: BTreeSet<String>,
    pub weaknesses: BTreeSet<String>,
    pub total_attempts: usize,
    pub total_time_spent: u64,
}

impl AggregateMetrics {
    pub fn has_data(&self) -> bool {
        self.total_attempts > 0
    }

    /// Topics in the 60..80 band: neither strength nor weakness.
    pub fn developing_topics(&self) -> Vec<String> {
        self.topic_scores
            .keys()
            .filter(|topic| !self.strengths.contains(*topic) && !self.weaknesses.contains(*topic))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaknessLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicTrend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicBreakdown {
    pub topic: String,
    pub avg_score: u32,
    pub weakness_level: WeaknessLevel,
    pub improvement_trend: TopicTrend,
    pub data_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    ConsistentLowPerformance,
    DecliningPerformanceTrend,
    InconsistentPerformance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFrequency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub frequency: PatternFrequency,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub patterns: Vec<Pattern>,
}

impl TrendResult {
    pub fn has_pattern(&self, kind: PatternKind) -> bool {
        self.patterns.iter().any(|pattern| pattern.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Ai,
    Fallback,
    Hybrid,
}

impl Provenance {
    /// `Ai` or `Fallback` when every part agrees, `Hybrid` when they mix.
    pub fn combine(parts: impl IntoIterator<Item = Provenance>) -> Provenance {
        parts
            .into_iter()
            .reduce(|acc, next| if acc == next { acc } else { Provenance::Hybrid })
            .unwrap_or(Provenance::Fallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Ai => "ai",
            Provenance::Fallback => "fallback",
            Provenance::Hybrid => "hybrid",
        }
    }
}

/// Which analysis the dual-path pipeline is asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTask {
    AdaptiveDifficulty,
    WeaknessAnalysis,
    LearningPath,
    DocumentTopics,
    DocumentObjectives,
    DocumentConcepts,
    DocumentRecommendations,
}

impl AnalysisTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisTask::AdaptiveDifficulty => "adaptive_difficulty",
            AnalysisTask::WeaknessAnalysis => "weakness_analysis",
            AnalysisTask::LearningPath => "learning_path",
            AnalysisTask::DocumentTopics => "document_topics",
            AnalysisTask::DocumentObjectives => "document_objectives",
            AnalysisTask::DocumentConcepts => "document_concepts",
            AnalysisTask::DocumentRecommendations => "document_recommendations",
        }
    }
}

/// Caller-facing analysis payload. Field names are a stable contract.
///
/// Percentages are rounded to whole numbers so the JSON form round-trips
/// without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub avg_score_pct: u32,
    pub topic_scores: BTreeMap<String, u32>,
    pub difficulty_scores: BTreeMap<String, u32>,
    pub variance: f64,
    pub time_efficiency: f64,
    pub consistency: f64,
    pub strengths: BTreeSet<String>,
    pub weaknesses: BTreeSet<String>,
    pub total_attempts: usize,
    pub direction: TrendDirection,
    pub patterns: Vec<Pattern>,
    pub recommended_difficulty: Difficulty,
    pub confidence: f64,
    pub reasoning: String,
    pub provenance: Provenance,
    pub recommendations: Vec<String>,
}

/// Weakness endpoint body: the arbitrated analysis plus per-topic detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaknessReport {
    pub user_id: String,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    pub topic_breakdown: Vec<TopicBreakdown>,
    pub progression_readiness: Readiness,
}
