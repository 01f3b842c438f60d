//! Error taxonomy for provider calls.
//!
//! The estimator and trimmer never fail; everything that can go wrong lives
//! between the relay and the upstream chat-completions API. [`ApiError`]
//! carries enough detail to decide whether a call is worth retrying
//! ([`is_transient`](ApiError::is_transient)) and what to tell the caller
//! ([`user_message`](ApiError::user_message),
//! [`outbound_status`](ApiError::outbound_status)).

use thiserror::Error;

/// Failure talking to the upstream model provider.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller sent something we refuse to forward.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No API key configured for the provider.
    #[error("no API key configured for the model provider")]
    MissingApiKey,

    /// Network-level failure: connect, timeout, body read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("provider HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider answered 2xx but embedded an `error` object.
    #[error("provider error: {0}")]
    Provider(String),

    /// Provider body was not the JSON we expected.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Provider answered without any choices.
    #[error("provider returned no choices")]
    EmptyResponse,
}

impl ApiError {
    /// The provider's HTTP status, if the failure came from one.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Rate limits, provider 5xx and network hiccups are transient. Client
    /// errors (400, 401, 403, 404, 422) and local failures never are.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            ApiError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Human-readable message safe to hand back to the relay's own caller.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidInput(msg) => format!("Invalid request: {msg}"),
            ApiError::MissingApiKey => "The relay is not configured with a provider API key".into(),
            ApiError::Request(e) if e.is_timeout() => "The model provider timed out".into(),
            ApiError::Request(_) => "Could not reach the model provider".into(),
            ApiError::Status { status, .. } => status_message(*status).into(),
            ApiError::Provider(msg) => format!("The model provider reported an error: {msg}"),
            ApiError::Parse(_) | ApiError::EmptyResponse => {
                "The model provider returned an unreadable response".into()
            }
        }
    }

    /// Short machine-readable code used in GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "BAD_USER_INPUT",
            ApiError::MissingApiKey => "NOT_CONFIGURED",
            ApiError::Request(e) if e.is_timeout() => "PROVIDER_TIMEOUT",
            ApiError::Request(_) => "PROVIDER_UNREACHABLE",
            ApiError::Status { status: 400, .. } => "PROVIDER_BAD_REQUEST",
            ApiError::Status { status: 401, .. } | ApiError::Status { status: 403, .. } => {
                "PROVIDER_AUTH"
            }
            ApiError::Status { status: 404, .. } => "MODEL_NOT_FOUND",
            ApiError::Status { status: 429, .. } => "RATE_LIMITED",
            ApiError::Status { .. } => "PROVIDER_UNAVAILABLE",
            ApiError::Provider(_) | ApiError::Parse(_) | ApiError::EmptyResponse => {
                "PROVIDER_BAD_RESPONSE"
            }
        }
    }

    /// HTTP status the relay should answer with.
    ///
    /// Provider 400/404/429 pass through since they describe the caller's
    /// request. Auth failures become 502: the relay's key is at fault, not
    /// the caller's.
    pub fn outbound_status(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) => 400,
            ApiError::MissingApiKey => 500,
            ApiError::Request(e) if e.is_timeout() => 504,
            ApiError::Request(_) => 502,
            ApiError::Status { status, .. } => match status {
                400 | 404 | 429 => *status,
                _ => 502,
            },
            ApiError::Provider(_) | ApiError::Parse(_) | ApiError::EmptyResponse => 502,
        }
    }
}

/// Status-to-message mapping for provider HTTP errors.
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => {
            "The request was rejected by the model provider \
             (the conversation may exceed the model's context length)"
        }
        401 => "Authentication with the model provider failed; check the API key",
        403 => "Access to the requested model is forbidden",
        404 => "The requested model was not found",
        429 => "Rate limit exceeded; please retry later",
        500 | 502 | 503 | 504 => "The model provider is temporarily unavailable",
        _ => "Unexpected response from the model provider",
    }
}
