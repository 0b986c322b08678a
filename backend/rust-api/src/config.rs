use std::env;
use std::time::Duration;

use crate::engine::credentials::{CredentialPool, MAX_CREDENTIAL_SLOTS};

const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_AI_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub bind_addr: String,
    pub ai: AiConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub model: String,
    pub credentials: CredentialPool,
    pub call_timeout_secs: u64,
    pub request_deadline_secs: u64,
}

impl AiConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            model: DEFAULT_AI_MODEL.to_string(),
            credentials: CredentialPool::empty(),
            call_timeout_secs: 12,
            request_deadline_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    pub performance_limit: u32,
    pub quiz_attempt_limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            performance_limit: 50,
            quiz_attempt_limit: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "adaptive_learning".to_string(),
            bind_addr: "0.0.0.0:8081".to_string(),
            ai: AiConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env_name = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml + APP__ overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let mongo_uri = string_setting(&settings, "database.mongo_uri", "MONGO_URI")
            .unwrap_or(defaults.mongo_uri);
        let mongo_database = string_setting(&settings, "database.mongo_database", "MONGO_DATABASE")
            .unwrap_or(defaults.mongo_database);
        let bind_addr = string_setting(&settings, "server.bind_addr", "BIND_ADDR")
            .unwrap_or(defaults.bind_addr);

        let ai = AiConfig {
            base_url: string_setting(&settings, "ai.base_url", "AI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ai.base_url),
            model: string_setting(&settings, "ai.model", "AI_MODEL").unwrap_or(defaults.ai.model),
            credentials: load_credentials(),
            call_timeout_secs: number_setting(
                &settings,
                "ai.call_timeout_secs",
                "AI_CALL_TIMEOUT_SECS",
            )?
            .unwrap_or(defaults.ai.call_timeout_secs),
            request_deadline_secs: number_setting(
                &settings,
                "ai.request_deadline_secs",
                "AI_REQUEST_DEADLINE_SECS",
            )?
            .unwrap_or(defaults.ai.request_deadline_secs),
        };

        if ai.credentials.is_empty() {
            tracing::warn!(
                "No GEMINI_API_KEY configured; every analysis will use the statistical path"
            );
        }

        let history = HistoryConfig {
            performance_limit: number_setting(
                &settings,
                "history.performance_limit",
                "HISTORY_PERFORMANCE_LIMIT",
            )?
            .map(|limit| limit as u32)
            .unwrap_or(defaults.history.performance_limit),
            quiz_attempt_limit: number_setting(
                &settings,
                "history.quiz_attempt_limit",
                "HISTORY_QUIZ_ATTEMPT_LIMIT",
            )?
            .map(|limit| limit as u32)
            .unwrap_or(defaults.history.quiz_attempt_limit),
        };

        Ok(Config {
            mongo_uri,
            mongo_database,
            bind_addr,
            ai,
            history,
        })
    }
}

/// `GEMINI_API_KEY`, then `GEMINI_API_KEY_2` .. `GEMINI_API_KEY_5`.
fn load_credentials() -> CredentialPool {
    let keys = std::iter::once("GEMINI_API_KEY".to_string())
        .chain((2..=MAX_CREDENTIAL_SLOTS).map(|n| format!("GEMINI_API_KEY_{n}")))
        .filter_map(|name| env::var(name).ok());
    CredentialPool::new(keys)
}

fn string_setting(settings: &config::Config, key: &str, env_key: &str) -> Option<String> {
    settings
        .get_string(key)
        .or_else(|_| env::var(env_key))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn number_setting(
    settings: &config::Config,
    key: &str,
    env_key: &str,
) -> Result<Option<u64>, config::ConfigError> {
    let Some(raw) = string_setting(settings, key, env_key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| config::ConfigError::Message(format!("{key} must be a non-negative integer")))
}
