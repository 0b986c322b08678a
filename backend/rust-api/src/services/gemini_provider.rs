use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::engine::{Credential, FailureReason, GenerativeProvider};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` adapter for the Gemini REST API.
///
/// Timeouts are owned by the orchestrator, so the client itself has none.
pub struct GeminiProvider {
    client: Client,
    endpoint: String,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/models/{}:generateContent", config.base_url, config.model),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<String, FailureReason> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, credential.expose_secret())
            .json(&body)
            .send()
            .await
            // without_url keeps the request target out of the message
            .map_err(|e| FailureReason::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FailureReason::ProviderRejected(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| FailureReason::MalformedOutput)?;

        reply_text(&body).ok_or(FailureReason::EmptyResponse)
    }
}

/// First candidate's first text part, if it carries anything.
fn reply_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
