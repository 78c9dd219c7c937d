//! Tool-level permission gating.
//!
//! Not part of the confirmation flow (§4.4 step 2, which is per-call and
//! interactive) — this is the coarser allowed-tools gate of §6.3's
//! `allowed_tools` config knob, checked before a call is even validated.

use std::collections::HashSet;

use serde_json::Value;

/// The outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// The call may proceed to validation/confirmation/execution.
    Allow,
    /// The call is rejected outright, with a reason.
    Deny(String),
    /// The policy defers to the interactive confirmation flow, with a
    /// reason shown alongside the tool's own confirmation prompt.
    Ask(String),
}

/// Decides whether a tool call is permitted at all, independent of the
/// tool's own per-call `should_confirm_execute`.
pub trait PermissionPolicy: Send + Sync {
    /// Check whether `tool_name` may be called with `args`.
    fn check(&self, tool_name: &str, args: &Value) -> PermissionDecision;
}

/// Allows every call. The default when no `allowed_tools` restriction is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPolicy;

impl PermissionPolicy for AllowAllPolicy {
    fn check(&self, _tool_name: &str, _args: &Value) -> PermissionDecision {
        PermissionDecision::Allow
    }
}

/// Restricts calls to a fixed allowlist of tool names (§6.3 `allowed_tools`).
#[derive(Debug, Clone)]
pub struct AllowedToolsPolicy {
    allowed: HashSet<String>,
}

impl AllowedToolsPolicy {
    /// Build a policy from an allowlist. An empty list means "no restriction"
    /// to match the source's "non-empty filters" semantics (§6.3).
    #[must_use]
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl PermissionPolicy for AllowedToolsPolicy {
    fn check(&self, tool_name: &str, _args: &Value) -> PermissionDecision {
        if self.allowed.is_empty() || self.allowed.contains(tool_name) {
            PermissionDecision::Allow
        } else {
            PermissionDecision::Deny(format!("tool '{tool_name}' is not in allowed_tools"))
        }
    }
}
