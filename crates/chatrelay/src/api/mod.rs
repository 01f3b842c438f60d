//! Provider call support: retry policy and request correlation.
//!
//! - [`retry`] — backoff with per-call jitter for transient provider
//!   failures (429, 5xx, network timeouts). Drives
//!   [`ChatClient::chat_with_retry`](crate::ChatClient::chat_with_retry).
//! - [`correlation`] — per-request IDs carried through logs and replies.

pub mod correlation;
pub mod retry;

// Re-export commonly used items at the module level.
pub use correlation::generate_request_id;
pub use retry::RetryConfig;
