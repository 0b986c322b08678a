use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::engine::learning_path::PathGoal;
use crate::extractors::ValidatedJson;
use crate::models::content::CandidateContent;
use crate::services::{recommendation_service::RecommendationService, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct ContentRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    /// Omit to rank the stored catalogue.
    #[serde(default)]
    #[validate(length(max = 200), nested)]
    pub candidates: Option<Vec<CandidateContent>>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Validate)]
pub struct LearningPathRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 512))]
    pub goal: String,
    #[serde(default = "default_days")]
    #[validate(range(min = 1, max = 365))]
    pub time_available_days: u32,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub focus_areas: Vec<String>,
}

fn default_days() -> u32 {
    30
}

/// POST /api/v1/recommendations/content
pub async fn content(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ContentRequest>,
) -> impl IntoResponse {
    Json(
        RecommendationService::new(&state)
            .recommend_content(&req.user_id, req.candidates, req.limit)
            .await,
    )
}

/// POST /api/v1/recommendations/learning-path
pub async fn learning_path(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LearningPathRequest>,
) -> impl IntoResponse {
    let goal = PathGoal {
        goal: req.goal,
        time_available_days: req.time_available_days,
        focus_areas: req.focus_areas,
    };
    Json(
        RecommendationService::new(&state)
            .learning_path(&req.user_id, goal)
            .await,
    )
}
