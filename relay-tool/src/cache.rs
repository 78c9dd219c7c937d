//! Cache of "always approve" confirmation decisions (§4.4).
//!
//! Mutated only by the confirmation handler's outcome, read by the
//! scheduler before it queries `should_confirm_execute` again.

use std::collections::HashSet;
use std::sync::Mutex;

/// Remembers earlier `ProceedAlways`/`ProceedAlwaysForTool` decisions so
/// the scheduler can skip confirmation for a call shape it has already seen.
pub trait ConfirmationCache: Send + Sync {
    /// Record that every future call to `tool_name` is approved
    /// (`ProceedAlwaysForTool`).
    fn approve_tool(&self, tool_name: &str);

    /// Record that calls to `tool_name` rooted at `command_root` are
    /// approved (`ProceedAlways`, shell-like tools).
    fn approve_invocation(&self, tool_name: &str, command_root: &str);

    /// Whether `tool_name` (optionally scoped to `command_root`) has
    /// already been approved.
    fn is_approved(&self, tool_name: &str, command_root: Option<&str>) -> bool;
}

/// Default process-lifetime, mutex-guarded implementation.
#[derive(Default)]
pub struct InMemoryConfirmationCache {
    tools: Mutex<HashSet<String>>,
    invocations: Mutex<HashSet<(String, String)>>,
}

impl InMemoryConfirmationCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfirmationCache for InMemoryConfirmationCache {
    fn approve_tool(&self, tool_name: &str) {
        self.tools.lock().unwrap().insert(tool_name.to_string());
    }

    fn approve_invocation(&self, tool_name: &str, command_root: &str) {
        self.invocations
            .lock()
            .unwrap()
            .insert((tool_name.to_string(), command_root.to_string()));
    }

    fn is_approved(&self, tool_name: &str, command_root: Option<&str>) -> bool {
        if self.tools.lock().unwrap().contains(tool_name) {
            return true;
        }
        match command_root {
            Some(root) => self
                .invocations
                .lock()
                .unwrap()
                .contains(&(tool_name.to_string(), root.to_string())),
            None => false,
        }
    }
}
