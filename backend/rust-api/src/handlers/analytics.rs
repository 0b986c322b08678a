use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::extractors::ValidatedJson;
use crate::models::analysis::AnalysisResult;
use crate::services::{
    analysis_service::AnalysisService,
    prediction_service::{PredictionService, DEFAULT_TIME_HORIZON_DAYS},
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct LearnerRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PredictionRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[serde(default = "default_time_horizon")]
    #[validate(range(min = 1, max = 365))]
    pub time_horizon_days: u32,
}

fn default_time_horizon() -> u32 {
    DEFAULT_TIME_HORIZON_DAYS
}

#[derive(Debug, Serialize)]
pub struct DifficultyResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

/// POST /api/v1/analytics/difficulty
pub async fn adaptive_difficulty(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LearnerRequest>,
) -> impl IntoResponse {
    let analysis = AnalysisService::new(&state)
        .adaptive_difficulty(&req.user_id)
        .await;
    Json(DifficultyResponse {
        user_id: req.user_id,
        analysis,
    })
}

/// POST /api/v1/analytics/weaknesses
pub async fn weaknesses(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LearnerRequest>,
) -> impl IntoResponse {
    Json(
        AnalysisService::new(&state)
            .weakness_report(&req.user_id)
            .await,
    )
}

/// POST /api/v1/analytics/predictions
pub async fn predictions(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<PredictionRequest>,
) -> impl IntoResponse {
    Json(
        PredictionService::new(&state)
            .predict(&req.user_id, req.time_horizon_days)
            .await,
    )
}
