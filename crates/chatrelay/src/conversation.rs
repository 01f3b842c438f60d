//! Assembling the conversation for a single relayed request.
//!
//! A conversation lives exactly as long as one request: the system
//! instruction, whatever prior turns the caller supplies, and the new user
//! message. Nothing is kept between requests.

use std::path::Path;

use crate::{Message, MessageRole};

/// Build `[system?, history..., user]`.
///
/// System turns inside `history` are dropped so the result carries at most
/// one system message, at index 0. A blank `system_prompt` is treated as
/// absent.
pub fn assemble(system_prompt: Option<&str>, history: Vec<Message>, user: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(Message::system(system));
    }

    messages.extend(
        history
            .into_iter()
            .filter(|m| m.role != MessageRole::System),
    );
    messages.push(Message::user(user));
    messages
}

/// Load prior turns from a JSON file holding `[{"role": ..., "content": ...}, ...]`.
pub fn read_history_file(path: impl AsRef<Path>) -> Result<Vec<Message>, String> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read history file '{}': {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse history file '{}': {e}", path.display()))
}
