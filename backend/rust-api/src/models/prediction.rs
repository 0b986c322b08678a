use serde::{Deserialize, Serialize};

use super::analysis::{Readiness, TrendDirection};
use super::attempt::Difficulty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallPrediction {
    pub current_avg_score: u32,
    pub predicted_score: u32,
    pub improvement: i32,
    pub trend: TrendDirection,
    pub confidence: f64,
    pub success_probability: f64,
    pub time_horizon_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPrediction {
    pub topic: String,
    pub current_score: u32,
    pub predicted_score: u32,
    pub improvement: i32,
    pub trend: TrendDirection,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyOutlook {
    pub current_difficulty: Difficulty,
    pub next_difficulty: Option<Difficulty>,
    pub readiness: Readiness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePrediction {
    pub user_id: String,
    pub overall: OverallPrediction,
    pub topics: Vec<TopicPrediction>,
    pub difficulty: DifficultyOutlook,
}
