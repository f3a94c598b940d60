//! The structured-output seam between the pipeline and a hosted model.
//!
//! [`LanguageModel`] is the only thing the generator and reviewer know about
//! the model provider. Production runs use [`ChatCompletionsClient`], which
//! speaks the OpenAI-compatible chat-completions protocol offered by Groq and
//! OpenRouter; tests substitute fakes.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{EduError, LlmErrorKind, Result};
use crate::prompts::Prompt;

// ============================================================================
// LanguageModel trait
// ============================================================================

/// One structured-output request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Name of the output contract, e.g. `generated_content`.
    pub contract: &'static str,
    /// System message, already carrying the JSON Schema of the reply.
    pub system: String,
    /// User message.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// JSON Schema the reply must satisfy.
    pub schema: serde_json::Value,
}

/// A hosted model that answers with JSON text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends the request and returns the raw reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Model identifier, used in logs and the health endpoint.
    fn model_name(&self) -> &str;
}

/// Sends `prompt` to `model` and parses the reply into `T`.
///
/// The JSON Schema of `T` is appended to the system message. Code fences
/// around the reply are tolerated; anything that does not deserialize into
/// `T` is a [`EduError::SchemaError`] for `contract`.
pub async fn request_structured<T>(
    model: &dyn LanguageModel,
    contract: &'static str,
    prompt: Prompt,
    temperature: f32,
) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = serde_json::to_value(schemars::schema_for!(T))?;
    let system = format!(
        "{}\n\nRespond with a single JSON object that matches this JSON Schema:\n{}",
        prompt.system,
        serde_json::to_string_pretty(&schema)?
    );
    let request = CompletionRequest {
        contract,
        system,
        user: prompt.user,
        temperature,
        schema,
    };

    let reply = model.complete(&request).await?;
    debug!(contract, bytes = reply.len(), "Received model reply");

    serde_json::from_str(strip_code_fences(&reply)).map_err(|e| {
        warn!(contract, error = %e, "Model reply did not parse");
        EduError::schema(contract, format!("invalid JSON reply: {e}"))
    })
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````).
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // The language tag runs to the end of the opening line, or up to the JSON
    // itself when the whole reply sits on one line.
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest.trim_start_matches(|c: char| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_')
        }),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

// ============================================================================
// Chat-completions wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// ChatCompletionsClient
// ============================================================================

/// [`LanguageModel`] backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    provider: String,
    key_env: &'static str,
}

impl ChatCompletionsClient {
    /// Builds a client for the configured provider.
    ///
    /// An empty API key is accepted here and reported as
    /// [`EduError::MissingApiKey`] when a call is attempted, so the web form
    /// can still be served without credentials.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", config.effective_base_url()),
            api_key: config.api_key.clone(),
            model: config.model_name.clone(),
            provider: config.provider.to_string(),
            key_env: config.provider.api_key_env(),
        }
    }

    /// The full URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(EduError::missing_api_key(&self.provider, self.key_env));
        }

        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(
            provider = %self.provider,
            model = %self.model,
            contract = request.contract,
            temperature = request.temperature,
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EduError::llm_api_error(LlmErrorKind::Network, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map_or(text, |envelope| envelope.error.message);
            warn!(status = status.as_u16(), "Model provider returned an error");
            return Err(EduError::llm_api_error(
                LlmErrorKind::from_status(status.as_u16()),
                format!("{} returned {status}: {message}", self.provider),
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            EduError::llm_api_error(LlmErrorKind::Other, format!("unreadable response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EduError::schema(request.contract, "reply contained no message content"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
