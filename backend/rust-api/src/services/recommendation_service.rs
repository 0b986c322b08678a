use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::engine::{
    aggregator, arbitration,
    learning_path::{self, PathGoal},
    prompts, scorer, trend, AiOrchestrator,
};
use crate::models::{
    analysis::{AggregateMetrics, AnalysisTask},
    content::{CandidateContent, ScoredContent},
    learning_path::LearningPath,
    profile::LearnerProfile,
};
use crate::services::AppState;

use super::history_service::HistoryService;

/// Rows fetched per content collection when the caller supplies no candidates.
pub const CANDIDATE_FETCH_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ContentRecommendations {
    pub user_id: String,
    pub profile: LearnerProfile,
    pub recommendations: Vec<ScoredContent>,
}

pub struct RecommendationService {
    history: HistoryService,
    orchestrator: AiOrchestrator,
    request_deadline: Duration,
}

impl RecommendationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            history: HistoryService::new(state),
            orchestrator: state.orchestrator.clone(),
            request_deadline: state.config.ai.request_deadline(),
        }
    }

    /// Ranks `candidates`, or the stored catalogue when none are given.
    pub async fn recommend_content(
        &self,
        user_id: &str,
        candidates: Option<Vec<CandidateContent>>,
        limit: usize,
    ) -> ContentRecommendations {
        let deadline = Instant::now() + self.request_deadline;
        let (profile, _) = self.profile(user_id, deadline).await;

        let candidates = match candidates {
            Some(candidates) => candidates,
            None => self.history.load_candidates(CANDIDATE_FETCH_LIMIT).await,
        };
        let candidate_count = candidates.len();

        let mut recommendations = scorer::rank(&profile, candidates);
        recommendations.truncate(limit);

        tracing::info!(
            user_id,
            candidates = candidate_count,
            returned = recommendations.len(),
            "Content ranked"
        );

        ContentRecommendations {
            user_id: user_id.to_string(),
            profile,
            recommendations,
        }
    }

    pub async fn learning_path(&self, user_id: &str, goal: PathGoal) -> LearningPath {
        let deadline = Instant::now() + self.request_deadline;
        let (profile, metrics) = self.profile(user_id, deadline).await;

        let task = AnalysisTask::LearningPath;
        let context = learning_path::path_context(&profile, &metrics, &goal);
        let prompt = prompts::build_prompt(task, &context);
        let outcome = self.orchestrator.run(task, &prompt, deadline).await;

        let (path, provenance) = arbitration::select(
            task,
            &outcome,
            |payload| learning_path::parse_ai_path(payload, &goal),
            || learning_path::template_path(&profile, &metrics, &goal),
        );

        tracing::info!(
            user_id,
            steps = path.steps.len(),
            total_minutes = path.total_minutes(),
            provenance = provenance.as_str(),
            "Learning path generated"
        );
        path
    }

    async fn profile(
        &self,
        user_id: &str,
        deadline: Instant,
    ) -> (LearnerProfile, AggregateMetrics) {
        let (records, preferences) = tokio::join!(
            self.history.load_attempts_until(user_id, deadline),
            self.history.load_preferences(user_id),
        );

        let metrics = aggregator::aggregate(&records);
        let trend = trend::analyze_trend(&records);
        let verdict = arbitration::statistical_verdict(&metrics, &trend);

        let profile = scorer::build_profile(
            user_id,
            &records,
            &metrics,
            trend.direction,
            &preferences,
            verdict.difficulty,
        );
        (profile, metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::Provenance;
    use crate::models::attempt::{Difficulty, RecordSource};
    use crate::services::datastore::InMemoryAttemptStore;
    use crate::services::test_support::{row, state, RoutedProvider};
    use serde_json::json;
    use std::sync::Arc;

    fn seeded_store() -> Arc<InMemoryAttemptStore> {
        let store = Arc::new(InMemoryAttemptStore::new());
        store.insert_attempts(
            "u1",
            RecordSource::Performance,
            vec![
                row(json!({"topic": "algebra", "score": 3, "total_questions": 10})),
                row(json!({"topic": "geometry", "score": 9, "total_questions": 10})),
            ],
        );
        store
    }

    fn goal(focus: &[&str]) -> PathGoal {
        PathGoal {
            goal: "Pass the final exam".into(),
            time_available_days: 14,
            focus_areas: focus.iter().map(|area| area.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_weak_area_content_ranks_first() {
        let state = state(seeded_store(), RoutedProvider::new(vec![]));
        let candidates = vec![
            CandidateContent::new("poetry", "hard").with_minutes(90),
            CandidateContent::new("algebra", "easy").with_minutes(20),
        ];

        let result = RecommendationService::new(&state)
            .recommend_content("u1", Some(candidates), 10)
            .await;

        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(result.recommendations[0].content.subject, "algebra");
        assert!(result.profile.weak_areas.contains("algebra"));
        assert!(result.recommendations[0]
            .relevance_factors
            .iter()
            .any(|factor| factor.contains("weak area")));
    }

    #[tokio::test]
    async fn test_stored_catalogue_used_when_no_candidates_given() {
        let store = seeded_store();
        store.insert_candidates(vec![
            row(json!({"title": "Algebra drill", "topic": "algebra", "question_count": 5})),
            row(json!({"title": "Shapes", "topic": "geometry", "question_count": 40})),
        ]);
        let state = state(store, RoutedProvider::new(vec![]));

        let result = RecommendationService::new(&state)
            .recommend_content("u1", None, 1)
            .await;

        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].content.title.as_deref(), Some("Algebra drill"));
    }

    #[tokio::test]
    async fn test_learning_path_from_model() {
        let provider = RoutedProvider::new(vec![(
            "Create a personalised learning path",
            r#"{"title": "Algebra recovery", "steps": [
                {"topic": "linear equations", "difficulty": "easy", "estimated_minutes": 45,
                 "activities": ["Worked examples"]}
            ]}"#,
        )]);
        let state = state(seeded_store(), provider);

        let path = RecommendationService::new(&state)
            .learning_path("u1", goal(&[]))
            .await;

        assert_eq!(path.provenance, Provenance::Ai);
        assert_eq!(path.title, "Algebra recovery");
        assert_eq!(path.steps[0].estimated_minutes, 45);
        assert_eq!(path.goal, "Pass the final exam");
    }

    #[tokio::test]
    async fn test_learning_path_template_when_model_unavailable() {
        let state = state(seeded_store(), RoutedProvider::new(vec![]));

        let path = RecommendationService::new(&state)
            .learning_path("u1", goal(&["Fractions"]))
            .await;

        assert_eq!(path.provenance, Provenance::Fallback);
        let topics: Vec<&str> = path.steps.iter().map(|step| step.topic.as_str()).collect();
        assert_eq!(topics, vec!["fractions", "algebra", "geometry"]);
        assert_eq!(path.steps[1].difficulty, Difficulty::Easy);
        assert_eq!(path.total_minutes(), 90);
    }
}
