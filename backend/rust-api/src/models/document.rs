use serde::{Deserialize, Serialize};
use validator::Validate;

use super::analysis::Provenance;

/// Output of the external document-ingestion collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DocumentSummary {
    #[validate(length(min = 1, max = 512))]
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub items: Vec<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInsights {
    pub filename: String,
    /// `hybrid` when only some subtasks were answered by the model.
    pub provenance: Provenance,
    pub topics: Insight,
    pub objectives: Insight,
    pub concepts: Insight,
    pub recommendations: Insight,
}
