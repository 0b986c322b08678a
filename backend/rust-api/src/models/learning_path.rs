use serde::{Deserialize, Serialize};

use super::analysis::Provenance;
use super::attempt::Difficulty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub order: u32,
    pub topic: String,
    pub difficulty: Difficulty,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub title: String,
    pub description: String,
    pub goal: String,
    pub time_available_days: u32,
    pub steps: Vec<PathStep>,
    pub provenance: Provenance,
    pub confidence: f64,
}

impl LearningPath {
    pub fn total_minutes(&self) -> u32 {
        self.steps.iter().map(|step| step.estimated_minutes).sum()
    }
}
