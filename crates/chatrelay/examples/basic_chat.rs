//! Minimal relay example: trim a long conversation and send it.
//!
//! Builds a conversation that overflows `gpt-3.5-turbo`'s input budget,
//! shows how much the trimmer drops, and sends what is left.
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run --example basic_chat
//! ```

use chatrelay::context::optimize_with_report;
use chatrelay::prelude::*;

#[tokio::main]
async fn main() -> Result<(), String> {
    // 1. Create the client.
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| "Set OPENAI_API_KEY env var to your OpenAI API key")?;
    let client = ChatClient::new(api_key).map_err(|e| e.to_string())?;

    // 2. Assemble a conversation with plenty of old turns.
    let history: Vec<Message> = (1..=20)
        .flat_map(|i| {
            [
                Message::user(format!("Question {i}: {}", "tell me more ".repeat(60))),
                Message::assistant(format!("Answer {i}: {}", "here is more ".repeat(60))),
            ]
        })
        .collect();
    let conversation = assemble(
        Some("You are a helpful assistant. Be concise."),
        history,
        "Summarize our conversation in one sentence.",
    );

    // 3. Trim to the model's budget.
    let model = "gpt-3.5-turbo";
    let outcome = optimize_with_report(&conversation, model);
    println!(
        "Dropped {} of {} messages (~{} tokens left, fits: {})",
        outcome.removed,
        conversation.len(),
        outcome.estimated_tokens,
        outcome.fits
    );

    // 4. Send and print.
    let body = ChatRequest::new(model, outcome.messages).with_max_tokens(256);
    let completion = client
        .chat_with_retry(&body, &RetryConfig::default())
        .await
        .map_err(|e| e.user_message())?;

    println!("\n{}", completion.content.unwrap_or_default());
    if let Some(usage) = completion.usage {
        println!("\n--- {} tokens ---", usage.total_tokens.unwrap_or(0));
    }

    Ok(())
}
