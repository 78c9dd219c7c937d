//! Per-model token limits.

/// Input/output/total token ceilings for one model.
#[derive(Debug, Clone, Copy)]
pub struct TokenLimits {
    /// Maximum input (prompt) tokens.
    pub input: usize,
    /// Maximum output (completion) tokens.
    pub output: usize,
    /// Maximum total tokens (context window).
    pub total: usize,
}

impl TokenLimits {
    /// The fallback used for any model not in the table.
    pub const DEFAULT: Self = Self {
        input: 100_000,
        output: 8_192,
        total: 100_000,
    };
}

/// Look up the token limits for `model` by canonical name, falling back to
/// [`TokenLimits::DEFAULT`] for anything not listed.
#[must_use]
pub fn limits_for_model(model: &str) -> TokenLimits {
    match model {
        "kimi-k2-instruct" => TokenLimits {
            input: 128_000,
            output: 8_192,
            total: 131_072,
        },
        "gemini-2.0-flash-exp" | "gemini-2.5-flash" => TokenLimits {
            input: 1_000_000,
            output: 8_192,
            total: 1_048_576,
        },
        "gemini-2.5-pro" => TokenLimits {
            input: 2_000_000,
            output: 8_192,
            total: 2_097_152,
        },
        "gpt-4o" | "gpt-4o-mini" => TokenLimits {
            input: 128_000,
            output: 16_384,
            total: 128_000,
        },
        "o1" | "o1-mini" => TokenLimits {
            input: 200_000,
            output: 100_000,
            total: 200_000,
        },
        _ => TokenLimits::DEFAULT,
    }
}
