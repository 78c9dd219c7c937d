//! Deterministic token-count estimator (§4.3).
//!
//! Exact ratios are part of the contract — implementations substituting a
//! real tokenizer are still expected to expose this estimator for tests
//! that assert deterministic behavior across implementations.

use relay_types::{Message, Part, ToolDefinition};

/// Estimates token counts from messages and tool definitions using a fixed
/// heuristic: ~4 characters/token, with small per-punctuation and
/// per-structure overheads.
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter {
    chars_per_token: f64,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    /// The default estimator: 4 characters per token.
    #[must_use]
    pub fn new() -> Self {
        Self { chars_per_token: 4.0 }
    }

    /// An estimator with a custom characters-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: f64) -> Self {
        Self { chars_per_token }
    }

    /// Estimate the tokens in a bare string: `len/4` plus a quarter-token
    /// per punctuation character.
    #[must_use]
    pub fn estimate_text(&self, text: &str) -> usize {
        let base = (text.len() as f64 / self.chars_per_token).ceil() as usize;
        let punctuation = text.chars().filter(|c| c.is_ascii_punctuation()).count();
        base + punctuation / 4
    }

    fn estimate_json(&self, value: &serde_json::Map<String, serde_json::Value>) -> usize {
        self.estimate_text(&serde_json::Value::Object(value.clone()).to_string())
    }

    /// Estimate the tokens in a single part: `+10` overhead for a function
    /// call (plus name and JSON-argument tokens), `+5` for a function
    /// response (plus JSON-response tokens), `+100` flat for any media part.
    #[must_use]
    pub fn estimate_part(&self, part: &Part) -> usize {
        match part {
            Part::Text(t) => self.estimate_text(t),
            Part::FunctionCall { name, args, .. } => {
                10 + self.estimate_text(name) + self.estimate_json(args)
            }
            Part::FunctionResponse { response, .. } => 5 + self.estimate_json(response),
            Part::InlineData { .. } | Part::FileData { .. } => 100,
        }
    }

    /// Estimate the tokens in one message: `+3` structural overhead plus
    /// the sum of its parts.
    #[must_use]
    pub fn estimate_message(&self, message: &Message) -> usize {
        3 + message.parts.iter().map(|p| self.estimate_part(p)).sum::<usize>()
    }

    /// Estimate the tokens in a whole message list.
    #[must_use]
    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Estimate the tokens a tool catalog adds to the prompt.
    #[must_use]
    pub fn estimate_tools(&self, tools: &[ToolDefinition]) -> usize {
        tools
            .iter()
            .map(|t| {
                self.estimate_text(&t.name)
                    + self.estimate_text(&t.description)
                    + self.estimate_text(&t.schema.to_string())
            })
            .sum()
    }
}
