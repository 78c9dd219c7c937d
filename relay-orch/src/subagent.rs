//! Subagent routing (§4.5, optional): a trigger-phrase keyed registry of
//! specialist system-instruction overrides, applied for one turn only.

/// One specialist profile: a substring trigger and the system prompt to
/// use for the turn instead of the session's base template.
#[derive(Debug, Clone)]
pub struct SubagentProfile {
    pub trigger: String,
    pub system_prompt: String,
}

/// A registry of [`SubagentProfile`]s, consulted before constructing each
/// turn's system instruction.
#[derive(Debug, Clone, Default)]
pub struct SubagentRegistry {
    profiles: Vec<SubagentProfile>,
}

impl SubagentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { profiles: Vec::new() }
    }

    pub fn register(&mut self, trigger: impl Into<String>, system_prompt: impl Into<String>) {
        self.profiles.push(SubagentProfile { trigger: trigger.into(), system_prompt: system_prompt.into() });
    }

    /// First profile whose trigger appears in `text`, if any. A pure
    /// functional lookup — no state is mutated, no new Turn state introduced.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<&SubagentProfile> {
        self.profiles.iter().find(|profile| text.contains(profile.trigger.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_trigger_overrides_system_prompt() {
        let mut registry = SubagentRegistry::new();
        registry.register("refactor", "You are a refactoring specialist.");
        let matched = registry.resolve("please refactor this module").unwrap();
        assert_eq!(matched.system_prompt, "You are a refactoring specialist.");
    }

    #[test]
    fn no_trigger_match_returns_none() {
        let mut registry = SubagentRegistry::new();
        registry.register("refactor", "x");
        assert!(registry.resolve("write some new code").is_none());
    }
}
