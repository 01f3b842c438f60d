//! Convenience re-exports for common `chatrelay` types.
//!
//! ```ignore
//! use chatrelay::prelude::*;
//! ```

pub use crate::{
    ApiError, ChatClient, ChatCompletion, ChatRequest, Message, MessageRole, UsageInfo,
};

pub use crate::api::{RetryConfig, generate_request_id};
pub use crate::context::{ContextBudget, estimate_tokens, fits_within_limit, optimize};
pub use crate::conversation::assemble;
