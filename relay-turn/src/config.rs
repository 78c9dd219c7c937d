//! Per-turn configuration (the turn-scoped slice of §6.3's configuration
//! surface; session-wide budgets live in `relay-orch`).

use relay_context::AutoCompressThreshold;
use relay_retry::RetryConfig;
use relay_types::SystemPrompt;

/// Configuration for one [`crate::Turn`].
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Canonical model name, passed through to the provider and the token
    /// manager's per-model limit table.
    pub model: String,
    /// System prompt for this turn (may be overridden per-turn by subagent
    /// routing, per §4.5).
    pub system: Option<SystemPrompt>,
    /// Retry Engine configuration every provider call is routed through
    /// (§4.2).
    pub retry: RetryConfig,
    /// Whether to auto-compress on overflow rather than failing.
    pub auto_compress: bool,
    /// Ratio of the total budget to compress down to.
    pub compress_threshold: AutoCompressThreshold,
    /// Reservation for the model's own response.
    pub max_output_tokens: Option<usize>,
    /// Runaway-loop guard: max stream→tools→restream iterations in one turn.
    pub max_iterations: usize,
    /// Consecutive identical tool calls (same name, same args) before
    /// `LoopDetected` is raised.
    pub loop_detection_window: usize,
    /// Sampling temperature (§6.3).
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter (§6.3).
    pub top_p: Option<f32>,
    /// Top-k sampling parameter; Gemini-specific, ignored by OpenAI-style adapters.
    pub top_k: Option<u32>,
    /// Sequences that stop generation.
    pub stop_sequences: Vec<String>,
}

impl TurnConfig {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            retry: RetryConfig::default(),
            auto_compress: true,
            compress_threshold: AutoCompressThreshold::DEFAULT,
            max_output_tokens: None,
            max_iterations: 50,
            loop_detection_window: 3,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: Vec::new(),
        }
    }
}
