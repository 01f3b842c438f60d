//! Context window management: token estimation, budgets, and trimming.
//!
//! The context window is the scarcest resource of any relayed request. This
//! module keeps conversations inside it in three steps:
//!
//! 1. **[`tokens`]** — [`estimate_tokens`] approximates token counts from
//!    character counts, weighting CJK ideographs heavier than other text.
//!
//! 2. **[`budget`]** — [`ContextBudget`] looks up the model's context window
//!    in a static table and checks the estimate against 80% of it, leaving
//!    the rest for the response.
//!
//! 3. **[`trim`]** — [`optimize`] drops the oldest turns between the system
//!    instruction and the newest message until the conversation fits.
//!
//! Everything here is pure and never fails.

pub mod budget;
pub mod tokens;
pub mod trim;

// Re-export commonly used items at the module level.
pub use budget::{
    ContextBudget, ContextUsage, DEFAULT_CONTEXT_WINDOW, ModelInfo, context_window_for,
    fits_within_limit, known_models,
};
pub use tokens::{estimate_message_tokens, estimate_tokens};
pub use trim::{TrimOutcome, optimize, optimize_with_report};
