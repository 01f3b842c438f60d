//! Server configuration from command-line flags and environment variables.
//!
//! Every flag has an environment fallback so the relay can be configured
//! entirely through the process environment (or a `.env` file, which the
//! binary loads first). [`ServerArgs`] converts into the pieces the server
//! needs via [`web_config`](ServerArgs::web_config) and
//! [`build_service`](ServerArgs::build_service).

use std::net::{IpAddr, SocketAddr};

use chatrelay::api::RetryConfig;
use chatrelay::{ChatClient, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, OPENAI_BASE_URL};
use clap::Parser;
use tracing::warn;

use crate::WebConfig;
use crate::service::{ChatDefaults, ChatService};

/// GraphQL and REST chat proxy for OpenAI-compatible APIs.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatrelay-web", version)]
pub struct ServerArgs {
    // ── Listener ───────────────────────────────────────────────
    /// Interface to bind.
    #[arg(long, env = "CHATRELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "CHATRELAY_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Allowed CORS origin (repeat or comma-separate). Empty allows any.
    #[arg(
        long = "cors-origin",
        env = "CHATRELAY_CORS_ORIGINS",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,

    // ── Provider ───────────────────────────────────────────────
    /// Provider API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    /// OpenAI-compatible API root.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_BASE_URL)]
    pub base_url: String,

    /// Retries for transient provider errors.
    #[arg(long, env = "CHATRELAY_RETRIES", default_value_t = 2)]
    pub retries: u32,

    // ── Request defaults ───────────────────────────────────────
    /// Model used when a request does not name one.
    #[arg(long, env = "CHATRELAY_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// System instruction used when a request does not supply one.
    #[arg(long, env = "CHATRELAY_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Default maximum response tokens.
    #[arg(long, env = "CHATRELAY_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    /// Default sampling temperature.
    #[arg(long, env = "CHATRELAY_TEMPERATURE")]
    pub temperature: Option<f32>,
}

impl ServerArgs {
    /// Listener settings.
    pub fn web_config(&self) -> Result<WebConfig, String> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| format!("invalid host '{}': {e}", self.host))?;
        Ok(WebConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            cors_origins: self
                .cors_origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        })
    }

    /// Request defaults.
    pub fn chat_defaults(&self) -> ChatDefaults {
        ChatDefaults {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Build the shared chat service.
    ///
    /// A missing API key is not fatal: health and model endpoints still work
    /// and chat requests fail with a clear error. Out-of-range request
    /// defaults are.
    pub fn build_service(&self) -> Result<ChatService, String> {
        let defaults = self.chat_defaults();
        defaults
            .validate()
            .map_err(|e| format!("invalid request defaults: {e}"))?;
        if self.api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; chat requests will fail until it is configured");
        }
        let client = ChatClient::with_base_url(self.api_key.clone(), self.base_url.clone())
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(ChatService::new(
            client,
            defaults,
            RetryConfig::with_retries(self.retries),
        ))
    }
}
