//! Per-component error types, and the neutral taxonomy callers see.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The neutral error-kind vocabulary surfaced to callers, independent of
/// which provider or component raised the underlying error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials missing, malformed, or rejected.
    Authentication,
    /// Credentials valid but insufficient permission.
    Authorization,
    /// Rate limit or quota exhausted.
    QuotaExceeded,
    /// The requested model doesn't exist or isn't available.
    ModelUnavailable,
    /// The request itself was malformed.
    InvalidRequest,
    /// The provider's server failed (5xx).
    Server,
    /// A network-level failure (DNS, connection reset, …).
    Network,
    /// The request timed out.
    Timeout,
    /// The conversation exceeds the model's context window and
    /// auto-compression is disabled or insufficient.
    TokenLimitExceeded,
    /// Something went wrong specifically in function-calling (malformed
    /// arguments, unknown tool name from the model, …).
    FunctionCalling,
    /// Content was filtered by a safety system.
    ContentFilter,
    /// A configuration value is invalid (e.g. `auto_compress_threshold`
    /// outside `[0.0, 1.0]`).
    Configuration,
    /// Anything else.
    Generic,
}

impl ErrorKind {
    /// Whether the Retry Engine should retry an error of this kind
    /// (§4.2 point 3: `QuotaExceeded, Server, Network, Timeout`).
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded | Self::Server | Self::Network | Self::Timeout
        )
    }
}

/// Structured detail attached to every neutral error kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message.
    pub message: String,
    /// HTTP status code, if applicable.
    pub status: Option<u16>,
    /// Provider-specific error code, if any.
    pub code: Option<String>,
    /// Arbitrary extra structured fields.
    pub details: HashMap<String, Value>,
}

impl ErrorDetail {
    /// A detail carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Errors from the Provider Adapter (C1).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level error (connection reset, DNS failure, …).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Rate limited by the provider; `retry_after` is best-effort parsed.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if the provider sent one.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Provider service temporarily unavailable (5xx).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Authentication failed (401).
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Authenticated but not authorized (403).
    #[error("authorization failed: {0}")]
    Authorization(String),
    /// Malformed or invalid request (400, not token-limit or content-filter).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model does not exist (404).
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// Prompt exceeds the model's context window.
    #[error("token limit exceeded: {0}")]
    TokenLimitExceeded(String),
    /// Content was rejected by a safety filter.
    #[error("content filtered: {0}")]
    ContentFiltered(String),
    /// Error while assembling or parsing a function call.
    #[error("function calling error: {0}")]
    FunctionCalling(String),
    /// Error raised while consuming a streaming response.
    #[error("stream error: {0}")]
    StreamError(String),
    /// Any other provider error, preserving the original cause.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Classify this error into the neutral taxonomy (§4.1.4 / §6.4).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::RateLimit { .. } => ErrorKind::QuotaExceeded,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::ServiceUnavailable(_) => ErrorKind::Server,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::ModelNotFound(_) => ErrorKind::ModelUnavailable,
            Self::TokenLimitExceeded(_) => ErrorKind::TokenLimitExceeded,
            Self::ContentFiltered(_) => ErrorKind::ContentFilter,
            Self::FunctionCalling(_) => ErrorKind::FunctionCalling,
            Self::InvalidRequest(_) | Self::StreamError(_) | Self::Other(_) => {
                ErrorKind::InvalidRequest
            }
        }
    }

    /// Whether the Retry Engine should retry this error (§4.2).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Suggested retry delay, if this error carries one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Errors from the Tool Scheduler / tool execution (C4).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Parameter validation failed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Tool execution itself failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The confirmation handler (or policy) denied this call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The call was cancelled before or during execution.
    #[error("cancelled")]
    Cancelled,
}

/// Errors from the Token Manager / context compression (C3).
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A compression strategy could not bring history under budget.
    #[error("compaction failed: {0}")]
    CompactionFailed(String),
    /// Prompt exceeds limits and auto-compression is disabled.
    #[error("token limit exceeded: prompt {prompt} tokens > limit {limit} tokens")]
    TokenLimitExceeded {
        /// Computed prompt token count.
        prompt: usize,
        /// The applicable limit.
        limit: usize,
    },
    /// An `auto_compress_threshold` (or similar ratio) outside `[0.0, 1.0]`
    /// was supplied at construction.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Errors from the Retry Engine (C2).
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// All attempts were exhausted; carries the last classified error.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        /// Attempts made.
        attempts: usize,
        /// The last provider error encountered.
        #[source]
        source: ProviderError,
    },
    /// The underlying error was not retryable; propagated immediately.
    #[error(transparent)]
    NonRetryable(#[from] ProviderError),
}

/// Errors from the Turn Engine (C5).
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// A provider call failed (after retries, if any).
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// A tool call failed outside the scheduler's own error containment
    /// (the scheduler normally turns tool failures into a call-level
    /// `Error` status plus a synthetic `FunctionResponse`, not a turn
    /// failure — this variant is for scheduler-infrastructure failures).
    #[error("tool scheduling error: {0}")]
    Tool(#[from] ToolError),
    /// Context preparation failed.
    #[error("context error: {0}")]
    Context(#[from] ContextError),
    /// A configured usage limit (requests, tool calls, tokens) was hit.
    #[error("usage limit exceeded: {0}")]
    UsageLimitExceeded(String),
    /// The turn was aborted via its cancellation token.
    #[error("cancelled")]
    Cancelled,
}

/// Errors from the Orchestrator (C6).
#[derive(Debug, thiserror::Error)]
pub enum OrchError {
    /// The owning turn failed.
    #[error("turn error: {0}")]
    Turn(#[from] TurnError),
    /// A session-level budget (`max_session_turns`, `max_conversation_length`)
    /// was exceeded.
    #[error("session budget exceeded: {0}")]
    BudgetExceeded(String),
    /// The session referenced does not exist (or has expired).
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// Crate-wide umbrella error, composing every component error via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A provider-adapter error.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// A tool error.
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// A context-manager error.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// A retry-engine error.
    #[error(transparent)]
    Retry(#[from] RetryError),
    /// A turn-engine error.
    #[error(transparent)]
    Turn(#[from] TurnError),
    /// An orchestrator error.
    #[error(transparent)]
    Orch(#[from] OrchError),
}

impl RelayError {
    /// Classify into the neutral taxonomy, falling back to `Generic` for
    /// component errors with no direct `ErrorKind` mapping.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider(e) => e.kind(),
            Self::Context(ContextError::TokenLimitExceeded { .. }) => ErrorKind::TokenLimitExceeded,
            Self::Context(ContextError::Configuration(_)) => ErrorKind::Configuration,
            Self::Context(ContextError::CompactionFailed(_)) => ErrorKind::Generic,
            Self::Tool(ToolError::PermissionDenied(_)) => ErrorKind::Authorization,
            Self::Tool(_) => ErrorKind::Generic,
            Self::Retry(RetryError::Exhausted { source, .. }) => source.kind(),
            Self::Retry(RetryError::NonRetryable(e)) => e.kind(),
            Self::Turn(TurnError::Provider(e)) => e.kind(),
            Self::Turn(TurnError::UsageLimitExceeded(_)) => ErrorKind::Generic,
            Self::Turn(_) => ErrorKind::Generic,
            Self::Orch(OrchError::Turn(t)) => match t {
                TurnError::Provider(e) => e.kind(),
                _ => ErrorKind::Generic,
            },
            Self::Orch(_) => ErrorKind::Generic,
        }
    }

    /// A fixed, user-facing message template per kind (§7), filling in
    /// the retry delay when known.
    #[must_use]
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Provider(ProviderError::RateLimit {
                retry_after: Some(d),
            }) => format!(
                "API quota exceeded. Please try again in {} seconds.",
                d.as_secs()
            ),
            Self::Provider(ProviderError::RateLimit { retry_after: None }) => {
                "API quota exceeded. Please try again shortly.".to_string()
            }
            other => other.to_string(),
        }
    }
}
