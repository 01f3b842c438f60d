//! Recency-biased conversation trimming.
//!
//! When a conversation is estimated to overflow the model's input budget,
//! the oldest intervening turns are dropped one at a time until it fits. The
//! first message (the system instruction, by convention) and the last
//! message (the new user turn) are never removed. If only those two remain
//! and the estimate still overflows, the shortened conversation is returned
//! as-is and the provider gets the final say.

use super::budget::ContextBudget;
use super::tokens::estimate_message_tokens;
use crate::{Message, MessageRole};

/// Trimming never goes below this many messages: the first and the last.
pub const MIN_RETAINED: usize = 2;

/// Result of [`optimize_with_report`].
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    /// The trimmed conversation.
    pub messages: Vec<Message>,
    /// How many messages were dropped.
    pub removed: usize,
    /// Estimated tokens of `messages`.
    pub estimated_tokens: usize,
    /// Whether `messages` fit the input budget. `false` means trimming hit
    /// the floor and the result is best-effort.
    pub fits: bool,
}

/// Trim `messages` to fit `model`'s input budget.
///
/// Returns the conversation unchanged when it already fits.
pub fn optimize(messages: &[Message], model: &str) -> Vec<Message> {
    optimize_with_report(messages, model).messages
}

/// Like [`optimize`], but also reports what was done.
pub fn optimize_with_report(messages: &[Message], model: &str) -> TrimOutcome {
    trim_to_budget(messages, ContextBudget::for_model(model))
}

/// Trim `messages` against an explicit budget.
pub fn trim_to_budget(messages: &[Message], budget: ContextBudget) -> TrimOutcome {
    let mut working = messages.to_vec();
    let mut removed = 0;
    let mut estimated_tokens = estimate_message_tokens(&working);

    while working.len() > MIN_RETAINED && !budget.fits_estimate(estimated_tokens) {
        let last = working.len() - 1;
        let Some(idx) = (1..last).find(|&i| working[i].role != MessageRole::System) else {
            break;
        };
        working.remove(idx);
        removed += 1;
        estimated_tokens = estimate_message_tokens(&working);
    }

    TrimOutcome {
        fits: budget.fits_estimate(estimated_tokens),
        messages: working,
        removed,
        estimated_tokens,
    }
}
