//! Token-budget-aware chat relay for OpenAI-compatible chat completion APIs.
//!
//! `chatrelay` sits between a chat frontend and a third-party LLM provider.
//! Each request assembles a conversation (system instruction, prior turns,
//! new user message), trims it so the estimated input stays under 80% of the
//! model's context window, forwards it, and returns a normalized reply.
//!
//! # Getting started
//!
//! ```ignore
//! use chatrelay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ApiError> {
//!     let client = ChatClient::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())?;
//!
//!     let conversation = assemble(
//!         Some("You are a helpful assistant."),
//!         previous_turns,
//!         "What did we decide yesterday?",
//!     );
//!     let trimmed = optimize(&conversation, "gpt-3.5-turbo");
//!
//!     let body = ChatRequest::new("gpt-3.5-turbo", trimmed);
//!     let completion = client.chat_with_retry(&body, &RetryConfig::default()).await?;
//!     println!("{}", completion.content.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Token estimation, model limit table, budget check, conversation trimming |
//! | [`conversation`] | Assembling a request conversation and loading history files |
//! | [`api`] | Retry with backoff, request correlation IDs |
//! | [`error`] | [`ApiError`] and the provider status-to-message mapping |
//!
//! The trimmer is pure and synchronous. It can run on any task without
//! coordination; only [`ChatClient`] performs I/O.

pub mod api;
pub mod context;
pub mod conversation;
pub mod error;
pub mod prelude;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use error::ApiError;

use api::retry::RetryConfig;

// ── Constants ──────────────────────────────────────────────────────

/// Base URL of the OpenAI API. Any OpenAI-compatible endpoint works.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for relayed requests.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// System instruction used when neither the caller nor the config sets one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Timeout for a single provider call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unset optional fields are omitted.
#[derive(Serialize, Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    model: Option<String>,
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`ChatClient::chat`].
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: Option<String>,
    /// Model that actually served the request, as reported by the provider.
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<UsageInfo>,
}

/// Token usage statistics.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ChatClient {
    /// Create a client for the OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, OPENAI_BASE_URL)
    }

    /// Create a client for any OpenAI-compatible endpoint.
    ///
    /// `base_url` is the API root; `/chat/completions` is appended.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chatrelay/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::MissingApiKey);
        }

        debug!(
            "LLM request: model={}, messages={}, max_tokens={:?}, temp={:?}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        let elapsed = start.elapsed();
        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            elapsed.as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: RawChatResponse = serde_json::from_str(&text)?;

        if let Some(err) = parsed.error {
            return Err(ApiError::Provider(err.message));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        let choice = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or(ApiError::EmptyResponse)?;

        debug!(
            "LLM output: {} chars text",
            choice.message.content.as_ref().map_or(0, |s| s.len())
        );

        Ok(ChatCompletion {
            content: choice.message.content,
            model: parsed.model,
            finish_reason: choice.finish_reason,
            usage: parsed.usage,
        })
    }

    /// Send a chat completion request, retrying transient failures.
    pub async fn chat_with_retry(
        &self,
        body: &ChatRequest,
        retry: &RetryConfig,
    ) -> Result<ChatCompletion, ApiError> {
        retry.run(|| self.chat(body)).await
    }
}
