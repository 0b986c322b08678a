use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::extractors::ValidatedJson;
use crate::models::document::DocumentSummary;
use crate::services::{document_service::DocumentService, AppState};

/// POST /api/v1/documents/insights
///
/// Takes the summary produced by document ingestion; raw files are never parsed here.
pub async fn insights(
    State(state): State<Arc<AppState>>,
    ValidatedJson(summary): ValidatedJson<DocumentSummary>,
) -> impl IntoResponse {
    Json(DocumentService::new(&state).insights(&summary).await)
}
