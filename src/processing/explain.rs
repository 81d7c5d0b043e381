//! LLM-backed rationale for a single match.
//!
//! The outbound call is the engine's only network dependency; every failure
//! here degrades to [`Explanation::Unavailable`] instead of failing the
//! surrounding request.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::profile::Profile;
use crate::models::config::LlmConfig;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("no LLM API key configured")]
    NotConfigured,

    #[error("failed to build LLM client: {0}")]
    Build(String),

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM returned status {0}")]
    Status(u16),

    #[error("LLM response carried no content")]
    EmptyResponse,
}

/// Outcome of an explanation request as shown to callers.
///
/// An explicit variant, not an optional string: "no explanation" is a state
/// the presentation layer renders, never a silent default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Explanation {
    Available(String),
    Unavailable,
}

/// An abstraction over services that justify a single match in prose.
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    /// Produce a short rationale for why `profile` matches `query`.
    async fn explain(&self, query: &str, profile: &Profile) -> Result<String, ExplainError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn explanation_prompt(query: &str, profile: &Profile) -> String {
    let areas = profile.areas.join(", ");
    format!(
        "A student is looking for faculty matching this research interest:\n\
         \"{query}\"\n\n\
         Candidate: {name}, {title}\n\
         Research areas: {areas}\n\
         Profile description: {description}\n\n\
         In two or three sentences, explain why this candidate matches the \
         student's interest. Mention concrete overlapping topics.",
        name = profile.name,
        title = profile.title,
        description = profile.description,
    )
}

/// Explainer backed by an OpenAI-style chat-completions endpoint.
pub struct LlmExplainer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl LlmExplainer {
    pub fn new(config: &LlmConfig) -> Result<Self, ExplainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExplainError::Build(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ExplanationProvider for LlmExplainer {
    async fn explain(&self, query: &str, profile: &Profile) -> Result<String, ExplainError> {
        let api_key = self.api_key.as_deref().ok_or(ExplainError::NotConfigured)?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You explain academic research matches concisely.".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: explanation_prompt(query, profile),
                },
            ],
            max_tokens: 200,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExplainError::Timeout
                } else {
                    ExplainError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ExplainError::Status(response.status().as_u16()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExplainError::Request(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExplainError::EmptyResponse)
    }
}
