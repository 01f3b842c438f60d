//! Chat relay server.
//!
//! Accepts chat requests over GraphQL and plain HTTP, trims each
//! conversation to the model's context budget, and forwards it to an
//! OpenAI-compatible provider.
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run -p chatrelay-web
//! OPENAI_API_KEY=sk-... cargo run -p chatrelay-web -- --model gpt-4o --port 8080
//! CHATRELAY_CORS_ORIGINS=https://app.example.com cargo run -p chatrelay-web
//! ```
//!
//! ## Sending messages
//!
//! **REST** (`POST /api/chat`):
//! ```json
//! {"message": "What is a context window?", "history": [{"role": "user", "content": "Hi"}]}
//! ```
//!
//! **GraphQL** (`POST /graphql`):
//! ```graphql
//! mutation { chat(input: { message: "What is a context window?" }) { content trimmedMessages } }
//! ```

use std::sync::Arc;

use chatrelay_web::{ServerArgs, build_router, serve_until};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), String> {
    // Missing .env is fine; real env vars still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();
    let web_config = args.web_config()?;
    let service = Arc::new(args.build_service()?);

    info!(
        "default model {}, provider {}",
        service.default_model(),
        args.base_url
    );

    let router = build_router(service, &web_config.cors_origins);
    serve_until(router, web_config.bind_addr, shutdown_signal(), |addr| {
        info!("chatrelay listening on http://{addr} (GraphQL at /graphql)");
    })
    .await
    .map_err(|e| format!("server error: {e}"))?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
