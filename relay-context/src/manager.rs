//! `prepare_messages_for_generation` (§4.3): the single entry point the
//! Turn Engine calls before every provider request.

use relay_types::{ContextError, Message};

use crate::counter::TokenCounter;
use crate::limits::{limits_for_model, TokenLimits};
use crate::strategies::CompressionStrategy;

/// Diagnostic returned alongside a (possibly compressed) message list.
#[derive(Debug, Clone, Default)]
pub struct CompressionDiagnostic {
    /// Whether compression actually ran.
    pub compression_performed: bool,
    /// Token count before compression.
    pub original_tokens: usize,
    /// Token count after compression (equal to `original_tokens` if none ran).
    pub compressed_tokens: usize,
    /// `original_tokens - compressed_tokens`.
    pub tokens_saved: usize,
    /// `compressed_tokens / original_tokens`, or `1.0` if nothing was compressed.
    pub ratio: f64,
}

/// Ratio applied to the compression target budget; validated at
/// construction since the source conflates two thresholds of the same
/// name and only one (a ratio in `[0.0, 1.0]`) is load-bearing here.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(into = "f64")]
pub struct AutoCompressThreshold(f64);

impl AutoCompressThreshold {
    /// The source's default: compress down to 80% of the available budget.
    pub const DEFAULT: Self = Self(0.8);

    /// Construct a threshold, rejecting anything outside `[0.0, 1.0]`.
    pub fn new(value: f64) -> Result<Self, ContextError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ContextError::Configuration(format!(
                "auto_compress_threshold must be in [0.0, 1.0], got {value}"
            )))
        }
    }

    /// The underlying ratio.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for AutoCompressThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<AutoCompressThreshold> for f64 {
    fn from(threshold: AutoCompressThreshold) -> Self {
        threshold.0
    }
}

impl<'de> serde::Deserialize<'de> for AutoCompressThreshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// Prepare `messages` for a generation call against `model`.
///
/// 1. Compute prompt tokens and a response reservation
///    (`min(max_output_tokens, 80% of the remaining budget)`).
/// 2. If the total and prompt both fit their limits, pass through
///    unchanged.
/// 3. Else, if `auto_compress`, compute
///    `target = floor((total_limit - response_reservation) * threshold)`
///    and apply `strategy`.
/// 4. Else, fail with [`ContextError::TokenLimitExceeded`].
pub fn prepare_messages_for_generation(
    messages: &[Message],
    model: &str,
    max_output_tokens: Option<usize>,
    auto_compress: bool,
    threshold: AutoCompressThreshold,
    strategy: &dyn CompressionStrategy,
    counter: &TokenCounter,
) -> Result<(Vec<Message>, CompressionDiagnostic), ContextError> {
    let limits = limits_for_model(model);
    let prompt_tokens = counter.estimate_messages(messages);

    let remaining = limits.total.saturating_sub(prompt_tokens);
    let response_reservation = max_output_tokens
        .unwrap_or(limits.output)
        .min((remaining as f64 * 0.8) as usize);

    if prompt_tokens + response_reservation <= limits.total && prompt_tokens <= limits.input {
        return Ok((
            messages.to_vec(),
            CompressionDiagnostic {
                compression_performed: false,
                original_tokens: prompt_tokens,
                compressed_tokens: prompt_tokens,
                tokens_saved: 0,
                ratio: 1.0,
            },
        ));
    }

    if !auto_compress {
        return Err(ContextError::TokenLimitExceeded {
            prompt: prompt_tokens,
            limit: limits.total,
        });
    }

    let target = target_tokens(limits, response_reservation, threshold);
    let compressed = strategy.compress(messages, target, counter);
    let compressed_tokens = counter.estimate_messages(&compressed);

    tracing::info!(
        strategy = strategy.name(),
        original_tokens = prompt_tokens,
        compressed_tokens,
        target,
        "compressed conversation history"
    );

    Ok((
        compressed,
        CompressionDiagnostic {
            compression_performed: true,
            original_tokens: prompt_tokens,
            compressed_tokens,
            tokens_saved: prompt_tokens.saturating_sub(compressed_tokens),
            ratio: if prompt_tokens == 0 {
                1.0
            } else {
                compressed_tokens as f64 / prompt_tokens as f64
            },
        },
    ))
}

fn target_tokens(limits: TokenLimits, response_reservation: usize, threshold: AutoCompressThreshold) -> usize {
    let budget = limits.total.saturating_sub(response_reservation) as f64;
    (budget * threshold.value()).floor() as usize
}
