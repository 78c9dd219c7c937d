//! Per-backend base URL, auth style, and canonical→wire model-name mapping
//! for the six OpenAI-compatible providers (§4.1 supplement).

/// How a backend expects its credential presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// `Authorization: Bearer <key>` plus `HTTP-Referer`/`X-Title` headers.
    BearerWithReferer,
}

/// Static profile for one OpenAI-compatible backend.
#[derive(Debug, Clone, Copy)]
pub struct OpenAiCompatibleProfile {
    /// Provider name, as accepted by `kimi_provider` config (§6.3).
    pub name: &'static str,
    /// API base URL, not including `/chat/completions`.
    pub base_url: &'static str,
    /// Credential presentation style.
    pub auth_style: AuthStyle,
}

/// All six supported backends (§4.1 supplement, resolved from `provider_factory.py`/`providers.py`).
pub const PROFILES: &[OpenAiCompatibleProfile] = &[
    OpenAiCompatibleProfile {
        name: "moonshot",
        base_url: "https://api.moonshot.ai/v1",
        auth_style: AuthStyle::Bearer,
    },
    OpenAiCompatibleProfile {
        name: "together",
        base_url: "https://api.together.xyz/v1",
        auth_style: AuthStyle::Bearer,
    },
    OpenAiCompatibleProfile {
        name: "deepinfra",
        base_url: "https://api.deepinfra.com/v1/openai",
        auth_style: AuthStyle::Bearer,
    },
    OpenAiCompatibleProfile {
        name: "groq",
        base_url: "https://api.groq.com/openai/v1",
        auth_style: AuthStyle::Bearer,
    },
    OpenAiCompatibleProfile {
        name: "fireworks",
        base_url: "https://api.fireworks.ai/inference/v1",
        auth_style: AuthStyle::Bearer,
    },
    OpenAiCompatibleProfile {
        name: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        auth_style: AuthStyle::BearerWithReferer,
    },
];

/// Look up a backend's profile by its `kimi_provider`-style name.
#[must_use]
pub fn profile_for(provider: &str) -> Option<&'static OpenAiCompatibleProfile> {
    PROFILES.iter().find(|p| p.name == provider)
}

/// Map a canonical model name to the wire name `provider` expects.
/// Unknown names pass through unchanged (§6.2).
#[must_use]
pub fn map_model_name(provider: &str, canonical: &str) -> String {
    match (provider, canonical) {
        ("moonshot", "kimi-k2-instruct") => "moonshot-v1-128k".to_string(),
        ("together", "kimi-k2-instruct") => "moonshotai/Kimi-K2-Instruct".to_string(),
        ("deepinfra", "kimi-k2-instruct") => "moonshotai/Kimi-K2-Instruct".to_string(),
        ("groq", "kimi-k2-instruct") => "moonshotai/kimi-k2-instruct".to_string(),
        ("fireworks", "kimi-k2-instruct") => "accounts/fireworks/models/kimi-k2-instruct".to_string(),
        ("openrouter", "kimi-k2-instruct") => "moonshotai/kimi-k2-instruct".to_string(),
        _ => canonical.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_profiles_are_found_by_name() {
        let profile = profile_for("moonshot").unwrap();
        assert_eq!(profile.auth_style, AuthStyle::Bearer);
    }

    #[test]
    fn openrouter_requires_referer_headers() {
        let profile = profile_for("openrouter").unwrap();
        assert_eq!(profile.auth_style, AuthStyle::BearerWithReferer);
    }

    #[test]
    fn unknown_provider_is_none() {
        assert!(profile_for("not-a-real-backend").is_none());
    }

    #[test]
    fn mapping_table_covers_all_six_backends_for_kimi_k2() {
        for profile in PROFILES {
            assert_ne!(map_model_name(profile.name, "kimi-k2-instruct"), "");
        }
    }

    #[test]
    fn unrecognized_model_name_passes_through() {
        assert_eq!(map_model_name("moonshot", "some-future-model"), "some-future-model");
    }
}
