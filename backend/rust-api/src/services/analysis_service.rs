use std::time::Duration;

use tokio::time::Instant;

use crate::engine::{aggregator, arbitration, prompts, trend, AiOrchestrator};
use crate::models::{
    analysis::{AggregateMetrics, AnalysisResult, AnalysisTask, WeaknessReport},
    attempt::AttemptRecord,
};
use crate::services::AppState;

use super::history_service::HistoryService;

/// Statistics first, then the model, then arbitration between the two.
pub struct AnalysisService {
    history: HistoryService,
    orchestrator: AiOrchestrator,
    request_deadline: Duration,
}

impl AnalysisService {
    pub fn new(state: &AppState) -> Self {
        Self {
            history: HistoryService::new(state),
            orchestrator: state.orchestrator.clone(),
            request_deadline: state.config.ai.request_deadline(),
        }
    }

    pub async fn adaptive_difficulty(&self, user_id: &str) -> AnalysisResult {
        let (_, _, result) = self.analyze(user_id, AnalysisTask::AdaptiveDifficulty).await;
        result
    }

    pub async fn weakness_report(&self, user_id: &str) -> WeaknessReport {
        let (records, metrics, analysis) =
            self.analyze(user_id, AnalysisTask::WeaknessAnalysis).await;

        WeaknessReport {
            user_id: user_id.to_string(),
            topic_breakdown: aggregator::topic_breakdown(&records),
            progression_readiness: aggregator::progression_readiness(&metrics),
            analysis,
        }
    }

    async fn analyze(
        &self,
        user_id: &str,
        task: AnalysisTask,
    ) -> (Vec<AttemptRecord>, AggregateMetrics, AnalysisResult) {
        let deadline = Instant::now() + self.request_deadline;
        let records = self.history.load_attempts_until(user_id, deadline).await;

        let metrics = aggregator::aggregate(&records);
        let trend = trend::analyze_trend(&records);

        let context = prompts::analysis_context(&metrics, &trend, &records);
        let prompt = prompts::build_prompt(task, &context);
        let outcome = self.orchestrator.run(task, &prompt, deadline).await;

        let result = arbitration::arbitrate_analysis(task, &outcome, &metrics, &trend);

        tracing::info!(
            user_id,
            task = task.as_str(),
            attempts = records.len(),
            provider_calls = outcome.attempts().len(),
            provenance = result.provenance.as_str(),
            recommended_difficulty = result.recommended_difficulty.as_str(),
            "Analysis complete"
        );

        (records, metrics, result)
    }
}
