//! Send a trimmed chat conversation to an OpenAI-compatible API and print the reply.
//!
//! Reads the API key from the `OPENAI_API_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Basic request
//! chatrelay --user "Summarize the plot of Hamlet"
//!
//! # Continue a saved conversation on a specific model
//! chatrelay --history chat.json --user "And the ending?" --model gpt-4
//!
//! # See what would be sent after trimming, without calling the API
//! chatrelay --history chat.json --user "And the ending?" --dry-run
//! ```

use std::process;

use chatrelay::api::RetryConfig;
use chatrelay::context::{ContextBudget, optimize_with_report};
use chatrelay::conversation::{assemble, read_history_file};
use chatrelay::{ChatClient, ChatRequest, DEFAULT_MODEL, OPENAI_BASE_URL};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Send a trimmed chat conversation to an OpenAI-compatible API.
#[derive(Parser)]
#[command(name = "chatrelay")]
struct Cli {
    // ── Message content ────────────────────────────────────────
    /// System prompt to set the assistant's behavior
    #[arg(long)]
    system: Option<String>,

    /// User message to send
    #[arg(long)]
    user: String,

    /// JSON file with prior turns: [{"role": "user", "content": "..."}, ...]
    #[arg(long)]
    history: Option<String>,

    // ── Model / provider ───────────────────────────────────────
    /// Model to use
    #[arg(long, env = "CHATRELAY_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API root
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_BASE_URL)]
    base_url: String,

    /// Provider API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    // ── Sampling / output ──────────────────────────────────────
    /// Maximum tokens in the response
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Retries for transient provider errors
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Print the trimmed conversation and its budget instead of sending it
    #[arg(long)]
    dry_run: bool,
}

async fn run(cli: Cli) -> Result<String, String> {
    let history = match &cli.history {
        Some(path) => read_history_file(path)?,
        None => Vec::new(),
    };

    let conversation = assemble(cli.system.as_deref(), history, &cli.user);
    let outcome = optimize_with_report(&conversation, &cli.model);
    let usage = ContextBudget::for_model(&cli.model).estimate_usage(&outcome.messages);

    eprintln!(
        "  [{}] kept {}/{} messages, {}",
        cli.model,
        outcome.messages.len(),
        conversation.len(),
        usage.to_log_string()
    );
    if !outcome.fits {
        eprintln!("  Warning: conversation still exceeds the input budget after trimming");
    }

    if cli.dry_run {
        return serde_json::to_string_pretty(&outcome.messages)
            .map_err(|e| format!("failed to format conversation: {e}"));
    }

    let client = ChatClient::with_base_url(cli.api_key, cli.base_url).map_err(|e| e.to_string())?;

    let mut body = ChatRequest::new(&cli.model, outcome.messages);
    body.max_tokens = cli.max_tokens;
    body.temperature = cli.temperature;

    let completion = client
        .chat_with_retry(&body, &RetryConfig::with_retries(cli.retries))
        .await
        .map_err(|e| format!("{} ({e})", e.user_message()))?;

    Ok(completion.content.unwrap_or_default())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(response) => println!("{response}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
