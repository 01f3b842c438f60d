//! The relay itself: one incoming chat → one trimmed provider call.
//!
//! [`ChatService`] is shared by the REST and GraphQL surfaces. It assembles
//! the conversation, trims it to the model's budget, forwards it, and
//! normalizes the provider's answer into a [`ChatReply`].

use std::time::Instant;

use async_graphql::{Enum, InputObject, SimpleObject};
use chatrelay::api::{RetryConfig, generate_request_id};
use chatrelay::context::optimize_with_report;
use chatrelay::conversation::assemble;
use chatrelay::{ApiError, ChatClient, ChatRequest, Message, MessageRole, UsageInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Role of a caller-supplied history turn.
///
/// Mirrors [`MessageRole`] so it can derive the GraphQL enum. `System` is
/// accepted but dropped during assembly.
#[derive(Enum, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::System => MessageRole::System,
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// A prior turn supplied by the caller.
#[derive(InputObject, Deserialize, Clone, Debug)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl From<HistoryMessage> for Message {
    fn from(m: HistoryMessage) -> Self {
        Message::new(m.role.into(), m.content)
    }
}

/// An incoming chat request. Shared by `POST /api/chat` and the GraphQL
/// `chat` mutation.
#[derive(InputObject, Deserialize, Clone, Debug, Default)]
pub struct ChatInput {
    /// The new user message.
    pub message: String,
    /// Prior turns, oldest first.
    #[serde(default)]
    #[graphql(default)]
    pub history: Vec<HistoryMessage>,
    /// Model override; falls back to the configured default.
    pub model: Option<String>,
    /// System instruction override.
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Token usage reported by the provider.
#[derive(SimpleObject, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[graphql(name = "Usage")]
pub struct UsageReply {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl From<UsageInfo> for UsageReply {
    fn from(u: UsageInfo) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// Normalized reply returned to the caller.
#[derive(SimpleObject, Serialize, Clone, Debug)]
pub struct ChatReply {
    /// Assistant text. Empty when the provider sent no content.
    pub content: String,
    /// Model that served the request.
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: UsageReply,
    /// How many history turns were dropped to fit the context window.
    pub trimmed_messages: u32,
    pub request_id: String,
}

/// Liveness report for `GET /health` and the GraphQL `health` query.
#[derive(SimpleObject, Serialize, Clone, Debug)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub default_model: String,
    pub uptime_secs: u64,
}

/// Values applied when the caller leaves a field unset.
#[derive(Debug, Clone)]
pub struct ChatDefaults {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatDefaults {
    /// Reject defaults the provider would refuse on every request.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("default model must not be empty".into());
        }
        check_sampling(self.temperature, self.max_tokens)
    }
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: chatrelay::DEFAULT_MODEL.to_string(),
            system_prompt: chatrelay::DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Shared, immutable relay state.
pub struct ChatService {
    client: ChatClient,
    defaults: ChatDefaults,
    retry: RetryConfig,
    started: Instant,
}

impl ChatService {
    pub fn new(client: ChatClient, defaults: ChatDefaults, retry: RetryConfig) -> Self {
        Self {
            client,
            defaults,
            retry,
            started: Instant::now(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.defaults.model
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_model: self.defaults.model.clone(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }

    /// Relay one chat turn.
    pub async fn chat(&self, input: ChatInput) -> Result<ChatReply, ApiError> {
        validate(&input)?;

        let request_id = generate_request_id();
        let model = input
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.defaults.model.clone());
        let system_prompt = input
            .system_prompt
            .unwrap_or_else(|| self.defaults.system_prompt.clone());

        let history = input.history.into_iter().map(Message::from).collect();
        let conversation = assemble(Some(system_prompt.as_str()), history, &input.message);
        let outcome = optimize_with_report(&conversation, &model);

        if outcome.removed > 0 {
            info!(
                "[{request_id}] trimmed {} of {} messages for {model} (~{} tokens)",
                outcome.removed,
                conversation.len(),
                outcome.estimated_tokens,
            );
        }
        if !outcome.fits {
            warn!(
                "[{request_id}] conversation still over budget for {model} after trimming (~{} tokens)",
                outcome.estimated_tokens,
            );
        }

        let body = ChatRequest {
            model: model.clone(),
            messages: outcome.messages,
            max_tokens: input.max_tokens.or(self.defaults.max_tokens),
            temperature: input.temperature.or(self.defaults.temperature),
        };

        let completion = self
            .client
            .chat_with_retry(&body, &self.retry)
            .await
            .inspect_err(|e| warn!("[{request_id}] provider call failed: {e}"))?;

        debug!(
            "[{request_id}] completed, finish_reason={:?}",
            completion.finish_reason
        );

        Ok(ChatReply {
            content: completion.content.unwrap_or_default(),
            model: completion.model.unwrap_or(model),
            finish_reason: completion.finish_reason,
            usage: completion.usage.map(UsageReply::from).unwrap_or_default(),
            trimmed_messages: u32::try_from(outcome.removed).unwrap_or(u32::MAX),
            request_id,
        })
    }
}

fn validate(input: &ChatInput) -> Result<(), ApiError> {
    if input.message.trim().is_empty() {
        return Err(ApiError::InvalidInput("message must not be empty".into()));
    }
    check_sampling(input.temperature, input.max_tokens).map_err(ApiError::InvalidInput)
}

/// Range checks shared by per-request overrides and server defaults.
fn check_sampling(temperature: Option<f32>, max_tokens: Option<u32>) -> Result<(), String> {
    if let Some(t) = temperature
        && !(0.0..=2.0).contains(&t)
    {
        return Err(format!("temperature must be between 0 and 2, got {t}"));
    }
    if max_tokens == Some(0) {
        return Err("max_tokens must be positive".into());
    }
    Ok(())
}
