//! `RelayConfig`: the core-relevant slice of §6.3's configuration surface.

use relay_context::AutoCompressThreshold;
use relay_retry::RetryConfig;
use serde::{Deserialize, Serialize};

/// Which built-in history-compression strategy to use (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStrategyKind {
    TruncateOldest,
    SlidingWindow,
    SummarizeMiddle,
}

/// Session-wide configuration the Orchestrator enforces between turns.
///
/// Deserializable from whatever config layer the embedding application
/// uses; `auto_compress_threshold` is rejected at deserialization time if
/// it falls outside `[0.0, 1.0]` (`AutoCompressThreshold`'s own `Deserialize`
/// impl enforces this, so no separate validation step is needed here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Canonical model name.
    pub model: String,
    /// Base system-prompt template, used unless a [`crate::subagent::SubagentRegistry`]
    /// match overrides it for the turn.
    pub system_prompt_template: String,
    /// If true, the confirmation handler auto-returns `ProceedAlways`.
    pub auto_confirm: bool,
    /// If non-empty, the tool registry is filtered to this set.
    pub allowed_tools: Vec<String>,
    /// Maximum turns in a session before `MaxSessionTurns` is raised.
    pub max_session_turns: Option<usize>,
    /// Maximum messages retained in history before compression is forced
    /// regardless of token count.
    pub max_conversation_length: Option<usize>,
    /// Ratio of the total token budget that triggers auto-compression.
    pub auto_compress_threshold: AutoCompressThreshold,
    /// Which compression strategy to apply when triggered.
    pub compression_strategy: CompressionStrategyKind,
    /// Retry Engine configuration threaded into every [`relay_turn::TurnConfig`]
    /// built for this session (§4.2).
    #[serde(default)]
    pub retry: RetryConfig,
}

impl RelayConfig {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt_template: String::new(),
            auto_confirm: false,
            allowed_tools: Vec::new(),
            max_session_turns: None,
            max_conversation_length: None,
            auto_compress_threshold: AutoCompressThreshold::DEFAULT,
            compression_strategy: CompressionStrategyKind::SlidingWindow,
            retry: RetryConfig::default(),
        }
    }
}
