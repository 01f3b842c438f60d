//! Model context windows and the input-token budget check.
//!
//! Every model gets a static ceiling from [`MODEL_LIMITS`]; unknown models
//! fall back to [`DEFAULT_CONTEXT_WINDOW`]. A conversation fits when its
//! estimated size stays strictly under 80% of the ceiling. The remaining 20%
//! is headroom for the response, which the input estimate does not cover.

use serde::Serialize;

use super::tokens::estimate_message_tokens;
use crate::Message;

/// Ceiling used for any model missing from [`MODEL_LIMITS`].
pub const DEFAULT_CONTEXT_WINDOW: usize = 4096;

/// Share of the context window the input may occupy.
pub const INPUT_BUDGET_RATIO: f64 = 0.80;

/// Context window sizes (in tokens) by model identifier.
pub const MODEL_LIMITS: &[(&str, usize)] = &[
    ("gpt-3.5-turbo", 4096),
    ("gpt-3.5-turbo-16k", 16_384),
    ("gpt-4", 8192),
    ("gpt-4-32k", 32_768),
    ("gpt-4-turbo", 128_000),
    ("gpt-4-turbo-preview", 128_000),
    ("gpt-4o", 128_000),
    ("gpt-4o-mini", 128_000),
];

/// Look up the context window for `model`. Exact match only.
pub fn context_window_for(model: &str) -> usize {
    MODEL_LIMITS
        .iter()
        .find(|(id, _)| *id == model)
        .map_or(DEFAULT_CONTEXT_WINDOW, |(_, limit)| *limit)
}

/// A model and its context window, as listed by [`known_models`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub context_window: usize,
}

/// Every model in the static table.
pub fn known_models() -> Vec<ModelInfo> {
    MODEL_LIMITS
        .iter()
        .map(|(id, limit)| ModelInfo {
            id: (*id).to_string(),
            context_window: *limit,
        })
        .collect()
}

/// Whether `messages` are estimated to fit under 80% of `model`'s window.
pub fn fits_within_limit(messages: &[Message], model: &str) -> bool {
    ContextBudget::for_model(model).fits(messages)
}

/// Input budget for one model.
///
/// ```
/// use chatrelay::Message;
/// use chatrelay::context::ContextBudget;
///
/// let budget = ContextBudget::for_model("gpt-3.5-turbo");
/// assert_eq!(budget.max_tokens(), 4096);
/// assert!(budget.fits(&[Message::user("hello")]));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
    max_tokens: usize,
}

impl ContextBudget {
    /// Budget for `model`, using the static limit table.
    pub fn for_model(model: &str) -> Self {
        Self {
            max_tokens: context_window_for(model),
        }
    }

    /// Override the context window size (in tokens).
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    /// The model's full context window in tokens.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Input threshold: 80% of the context window. Estimates must stay
    /// strictly below this.
    pub fn input_threshold(&self) -> f64 {
        self.max_tokens as f64 * INPUT_BUDGET_RATIO
    }

    /// Whether `messages` fit under the input threshold.
    pub fn fits(&self, messages: &[Message]) -> bool {
        self.fits_estimate(estimate_message_tokens(messages))
    }

    /// Whether an already computed estimate fits under the input threshold.
    pub fn fits_estimate(&self, estimated_tokens: usize) -> bool {
        (estimated_tokens as f64) < self.input_threshold()
    }

    /// Estimate the tokens consumed by `messages` against this window.
    pub fn estimate_usage(&self, messages: &[Message]) -> ContextUsage {
        let estimated_tokens = estimate_message_tokens(messages);
        let usage_pct = if self.max_tokens > 0 {
            estimated_tokens as f64 / self.max_tokens as f64
        } else {
            1.0
        };

        ContextUsage {
            estimated_tokens,
            max_tokens: self.max_tokens,
            usage_pct,
        }
    }
}

/// Snapshot of context usage at a point in time.
#[derive(Debug)]
pub struct ContextUsage {
    /// Estimated tokens consumed.
    pub estimated_tokens: usize,
    /// Maximum context window.
    pub max_tokens: usize,
    /// Usage as a fraction of the full window (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl ContextUsage {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: ~{} tokens ({:.0}% of {})",
            self.estimated_tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}
