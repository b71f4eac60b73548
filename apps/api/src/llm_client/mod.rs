/// Completion Gateway: the single point of entry for all language-model calls.
///
/// ARCHITECTURAL RULE: No other module may call the completion service directly.
/// All LLM interactions MUST go through this module.
///
/// The upstream service is unreliable and non-deterministic: the same prompt may
/// come back as bare JSON, fenced JSON, prose around JSON, or an already-parsed
/// object. This module only transports; shaping happens in `planning::normalizer`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const REFERER: &str = "http://localhost:3000";
const APP_TITLE: &str = "Business Plan Generator";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed completion payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Completion service returned no content")]
    EmptyContent,
}

impl LlmError {
    /// The message shown to end users in place of a plan.
    pub fn upstream_message(&self) -> String {
        match self {
            LlmError::Http(e) if e.is_timeout() => "The AI service timed out".to_string(),
            LlmError::Http(e) => e.to_string(),
            LlmError::Api { message, .. } => message.clone(),
            LlmError::Parse(_) => "The AI service returned a malformed response".to_string(),
            LlmError::EmptyContent => "No content received".to_string(),
        }
    }

    /// Status to mirror back to HTTP callers of the raw completion route.
    pub fn status(&self) -> u16 {
        match self {
            LlmError::Api { status, .. } => *status,
            LlmError::Http(e) if e.is_timeout() => 504,
            _ => 502,
        }
    }
}

/// The completion as it came off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCompletion {
    /// Free-form text: bare JSON, fenced JSON, or prose with embedded JSON.
    Text(String),
    /// The provider already returned a structured object (forced JSON mode).
    Structured(Value),
}

impl RawCompletion {
    /// Text form of the completion, used for fallback narratives and 422 bodies.
    pub fn as_text(&self) -> String {
        match self {
            RawCompletion::Text(text) => text.clone(),
            RawCompletion::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Seam between the plan pipeline and the completion service.
/// Carried in `AppState` as `Arc<dyn CompletionGateway>`.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<RawCompletion, LlmError>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
/// No retries: a failed call is reported and the user resubmits.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(
        api_url: String,
        api_key: String,
        model: String,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_url,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionGateway for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<RawCompletion, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Completion API returned {}: {}", status, body);
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "API request failed".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .unwrap_or(Value::Null);

        let completion = match content {
            Value::String(text) if text.trim().is_empty() => return Err(LlmError::EmptyContent),
            Value::String(text) => RawCompletion::Text(text),
            Value::Null => return Err(LlmError::EmptyContent),
            other => RawCompletion::Structured(other),
        };

        debug!(
            "Completion call succeeded: {} chars",
            completion.as_text().len()
        );
        Ok(completion)
    }
}
