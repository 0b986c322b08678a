use std::time::Duration;

use tokio::time::Instant;

use crate::engine::{arbitration, documents, prompts, AiOrchestrator, AiOutcome};
use crate::models::{
    analysis::{AnalysisTask, Provenance},
    document::{DocumentInsights, DocumentSummary, Insight},
};
use crate::services::AppState;

/// Four independent model calls per document, each with its own fallback.
pub struct DocumentService {
    orchestrator: AiOrchestrator,
    request_deadline: Duration,
}

impl DocumentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            orchestrator: state.orchestrator.clone(),
            request_deadline: state.config.ai.request_deadline(),
        }
    }

    pub async fn insights(&self, summary: &DocumentSummary) -> DocumentInsights {
        let deadline = Instant::now() + self.request_deadline;
        let context = documents::document_context(summary);

        let run = |task: AnalysisTask| {
            let prompt = prompts::build_prompt(task, &context);
            async move { self.orchestrator.run(task, &prompt, deadline).await }
        };

        // one shared deadline; each subtask falls back on its own
        let (topics, objectives, concepts, recommendations) = tokio::join!(
            run(AnalysisTask::DocumentTopics),
            run(AnalysisTask::DocumentObjectives),
            run(AnalysisTask::DocumentConcepts),
            run(AnalysisTask::DocumentRecommendations),
        );

        let fallback_topics = documents::fallback_topics(summary);

        let topics = insight(AnalysisTask::DocumentTopics, &topics, || {
            fallback_topics.clone()
        });
        let objectives = insight(AnalysisTask::DocumentObjectives, &objectives, || {
            documents::fallback_objectives(&fallback_topics)
        });
        let concepts = insight(AnalysisTask::DocumentConcepts, &concepts, || {
            documents::fallback_concepts(summary)
        });
        let recommendations = insight(AnalysisTask::DocumentRecommendations, &recommendations, || {
            documents::fallback_recommendations(&fallback_topics)
        });

        let provenance = Provenance::combine([
            topics.provenance,
            objectives.provenance,
            concepts.provenance,
            recommendations.provenance,
        ]);

        tracing::info!(
            filename = %summary.filename,
            provenance = provenance.as_str(),
            content_chars = summary.content.chars().count(),
            topics = topics.provenance.as_str(),
            objectives = objectives.provenance.as_str(),
            concepts = concepts.provenance.as_str(),
            recommendations = recommendations.provenance.as_str(),
            "Document insights complete"
        );

        DocumentInsights {
            filename: summary.filename.clone(),
            provenance,
            topics,
            objectives,
            concepts,
            recommendations,
        }
    }
}

fn insight(
    task: AnalysisTask,
    outcome: &AiOutcome,
    fallback: impl FnOnce() -> Vec<String>,
) -> Insight {
    let (items, provenance) =
        arbitration::select(task, outcome, documents::parse_string_list, fallback);
    Insight { items, provenance }
}
