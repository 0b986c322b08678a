use std::sync::Arc;

use mongodb::{bson::doc, Client as MongoClient};

use crate::config::Config;
use crate::engine::{AiOrchestrator, GenerativeProvider};

use self::datastore::{AttemptStore, MongoAttemptStore};
use self::gemini_provider::GeminiProvider;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn AttemptStore>,
    pub orchestrator: AiOrchestrator,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Testing MongoDB connection with ping...");

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            mongo.run_command(doc! { "ping": 1 }),
        )
        .await
        .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 5s"))??;

        tracing::info!(
            credential_slots = config.ai.credentials.len(),
            model = %config.ai.model,
            "Datastore reachable, generative provider configured"
        );

        let provider = Arc::new(GeminiProvider::new(&config.ai));
        let store = Arc::new(MongoAttemptStore::new(mongo));
        Ok(Self::with_components(config, store, provider))
    }

    /// Wires explicit collaborators; used by tests and offline runs.
    pub fn with_components(
        config: Config,
        store: Arc<dyn AttemptStore>,
        provider: Arc<dyn GenerativeProvider>,
    ) -> Self {
        let orchestrator = AiOrchestrator::new(
            provider,
            config.ai.credentials.clone(),
            config.ai.call_timeout(),
        );
        Self {
            config,
            store,
            orchestrator,
        }
    }
}

pub mod analysis_service;
pub mod datastore;
pub mod document_service;
pub mod gemini_provider;
pub mod history_service;
pub mod prediction_service;
pub mod recommendation_service;

#[cfg(test)]
pub(crate) mod test_support;
