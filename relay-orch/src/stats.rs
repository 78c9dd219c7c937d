//! Session statistics aggregation (§4.6).

/// Running totals the Orchestrator maintains across a session's turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    /// Turns completed (including ones that errored or were cancelled).
    pub turns: usize,
    /// Total tool calls requested across all turns.
    pub tool_calls: usize,
    /// Tool calls whose response carried no `error` field.
    pub successful_calls: usize,
}

impl SessionStats {
    /// `successful_calls / tool_calls`, or `1.0` if no calls were made yet.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.tool_calls == 0 {
            1.0
        } else {
            self.successful_calls as f64 / self.tool_calls as f64
        }
    }
}
