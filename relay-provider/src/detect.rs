//! Canonical-model-name provider detection (§6.3).

use relay_types::ProviderError;

/// Which wire protocol a canonical model name maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Google Gemini native function-calling.
    Gemini,
    /// An OpenAI-compatible `/chat/completions` backend (Moonshot/Kimi and peers).
    OpenAiCompatible,
}

/// Detect which adapter a canonical model name routes to.
///
/// `claude-*` names are recognized by the source configuration surface
/// but have no adapter in this core (only Gemini and OpenAI-style are
/// implemented here) and are treated the same as any unrecognized prefix.
pub fn detect_provider(model: &str) -> Result<ProviderKind, ProviderError> {
    if model.starts_with("gemini-") {
        Ok(ProviderKind::Gemini)
    } else if model.starts_with("kimi-") || model.starts_with("gpt-") || model.starts_with("o1-") {
        Ok(ProviderKind::OpenAiCompatible)
    } else {
        Err(ProviderError::ModelNotFound(format!(
            "no provider recognizes model '{model}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gemini_models() {
        assert_eq!(detect_provider("gemini-2.0-flash-exp").unwrap(), ProviderKind::Gemini);
    }

    #[test]
    fn detects_openai_compatible_models() {
        assert_eq!(detect_provider("kimi-k2-instruct").unwrap(), ProviderKind::OpenAiCompatible);
        assert_eq!(detect_provider("gpt-4o").unwrap(), ProviderKind::OpenAiCompatible);
        assert_eq!(detect_provider("o1-mini").unwrap(), ProviderKind::OpenAiCompatible);
    }

    #[test]
    fn unknown_model_raises() {
        assert!(detect_provider("unknown-model").is_err());
    }
}
