//! Configuration model loaded from external sources.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Settings for the outbound LLM explanation call.
#[derive(Clone, Debug, Deserialize)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
/// Basic configuration shared across handlers.
pub struct ServerConfig {
    pub database_url: String,
    pub zmq_address: String,
    pub use_ann_index: bool,
    pub snippet_max_chars: usize,
    pub llm: LlmConfig,
}

impl ServerConfig {
    /// Layer an optional `config.yaml` under `MATCHER_`-prefixed
    /// environment variables (e.g. `MATCHER_LLM__API_KEY`).
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database_url", "app.db")?
            .set_default("zmq_address", "tcp://127.0.0.1:5555")?
            .set_default("use_ann_index", false)?
            .set_default("snippet_max_chars", 220i64)?
            .set_default("llm.api_url", "https://api.openai.com/v1/chat/completions")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.timeout_secs", 20i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("MATCHER").separator("__"))
            .build()?
            .try_deserialize()
    }
}
