//! GraphQL and REST chat proxy built on `chatrelay`.
//!
//! `chatrelay-web` provides an axum server that accepts chat requests, trims
//! each conversation to the target model's context budget, forwards it to an
//! OpenAI-compatible provider, and returns a normalized reply.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatrelay::ChatClient;
//! use chatrelay::api::RetryConfig;
//! use chatrelay_web::{ChatDefaults, ChatService, WebConfig, spawn_web};
//!
//! let client = ChatClient::new(api_key)?;
//! let service = ChatService::new(client, ChatDefaults::default(), RetryConfig::default());
//!
//! let addr = spawn_web(Arc::new(service), WebConfig::default()).await?;
//! println!("GraphQL: http://{addr}/graphql");
//! ```
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/health` | Liveness, version, default model, uptime |
//! | GET | `/api/models` | Model context-window table |
//! | POST | `/api/chat` | Relay a chat turn (JSON body) |
//! | POST | `/graphql` | GraphQL `health`, `models`, `chat` |
//! | GET | `/graphql` | GraphiQL explorer |

mod api;
pub mod config;
pub mod graphql;
mod server;
pub mod service;

pub use api::{ErrorBody, ErrorResponse};
pub use config::ServerArgs;
pub use server::{build_router, cors_layer, serve_until};
pub use service::{ChatDefaults, ChatInput, ChatReply, ChatService, Health, HistoryMessage, Role};

use std::net::SocketAddr;
use std::sync::Arc;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:4000`.
    pub bind_addr: SocketAddr,
    /// Allowed CORS origins. Empty (the default) allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            cors_origins: Vec::new(),
        }
    }
}

/// Spawn the web server on a Tokio task.
///
/// Returns the bound address. The server runs until the Tokio runtime shuts
/// down.
pub async fn spawn_web(service: Arc<ChatService>, config: WebConfig) -> std::io::Result<SocketAddr> {
    let router = server::build_router(service, &config.cors_origins);
    server::start_server(router, config.bind_addr).await
}
