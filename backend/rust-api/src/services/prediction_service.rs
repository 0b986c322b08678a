use crate::engine::prediction;
use crate::models::prediction::PerformancePrediction;
use crate::services::AppState;

use super::history_service::HistoryService;

pub const DEFAULT_TIME_HORIZON_DAYS: u32 = 7;

pub struct PredictionService {
    history: HistoryService,
}

impl PredictionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            history: HistoryService::new(state),
        }
    }

    /// Statistical forecast only; the model is never consulted here.
    pub async fn predict(&self, user_id: &str, time_horizon_days: u32) -> PerformancePrediction {
        let records = self.history.load_attempts(user_id).await;
        let forecast = prediction::predict_performance(user_id, &records, time_horizon_days);

        tracing::info!(
            user_id,
            attempts = records.len(),
            trend = forecast.overall.trend.as_str(),
            predicted_score = forecast.overall.predicted_score,
            "Performance prediction complete"
        );
        forecast
    }
}
