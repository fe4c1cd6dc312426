/// LLM Client: the single point of entry for all completion API calls.
///
/// No other module talks to the model provider directly. Callers depend on the
/// `CompletionProvider` trait so the interview engine can run against a scripted
/// provider in tests.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod prompts;

/// Models tried in order after the configured primary model fails.
pub const FALLBACK_MODELS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-0125",
    "gpt-3.5-turbo-instruct",
];
pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 800;
const EVALUATION_TEMPERATURE: f32 = 0.2;
const EVALUATION_MAX_TOKENS: u32 = 1200;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM returned an unusable value: {0}")]
    InvalidOutput(String),

    #[error("All {attempted} models failed; last error: {last}")]
    AllModelsFailed { attempted: usize, last: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a conversation as sent to the completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Conversational reply settings.
    pub fn chat(system: impl Into<String>, messages: Vec<ChatTurn>) -> Self {
        Self {
            system: system.into(),
            messages,
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
        }
    }

    /// Low-temperature settings for structured (JSON) output.
    pub fn structured(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![ChatTurn::user(prompt)],
            temperature: EVALUATION_TEMPERATURE,
            max_tokens: EVALUATION_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub used_fallback_model: bool,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for an OpenAI-compatible chat completions endpoint.
/// Falls back through `FALLBACK_MODELS` when the primary model fails.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    primary_model: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, primary_model: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            api_key,
            api_url,
            primary_model,
        })
    }

    pub fn primary_model(&self) -> &str {
        &self.primary_model
    }

    /// Primary model first, then every fallback model that differs from it.
    fn model_order(&self) -> Vec<&str> {
        let mut order = vec![self.primary_model.as_str()];
        order.extend(
            FALLBACK_MODELS
                .iter()
                .copied()
                .filter(|m| *m != self.primary_model),
        );
        order
    }

    async fn call_model(&self, model: &str, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: ChatRole::System,
            content: &request.system,
        });
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role,
            content: &m.content,
        }));

        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = &parsed.usage {
            debug!(
                "LLM call succeeded: model={model}, prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let models = self.model_order();
        let mut last_error: Option<LlmError> = None;

        for (i, model) in models.iter().enumerate() {
            info!("Sending completion request using {model}");
            match self.call_model(model, request).await {
                Ok(text) => {
                    return Ok(Completion {
                        text,
                        model: model.to_string(),
                        used_fallback_model: i > 0,
                    })
                }
                Err(e) => {
                    warn!("Model {model} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(LlmError::AllModelsFailed {
            attempted: models.len(),
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

/// Calls the provider and deserializes the reply as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn complete_json<T: DeserializeOwned>(
    provider: &dyn CompletionProvider,
    request: &CompletionRequest,
) -> Result<T, LlmError> {
    let completion = provider.complete(request).await?;
    let text = strip_json_fences(&completion.text);
    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Result of a minimal round-trip used to check that the API key works.
#[derive(Debug, Serialize)]
pub struct KeyProbe {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn probe_key(provider: &dyn CompletionProvider) -> KeyProbe {
    let request = CompletionRequest {
        system: String::new(),
        messages: vec![ChatTurn::user("Hello")],
        temperature: CHAT_TEMPERATURE,
        max_tokens: 5,
    };
    match provider.complete(&request).await {
        Ok(completion) => KeyProbe {
            valid: true,
            response: Some(completion.text),
            error: None,
        },
        Err(e) => {
            warn!("API key probe failed: {e}");
            KeyProbe {
                valid: false,
                response: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}
