//! Turn state machine (§4.5).

/// Where a [`crate::Turn`] is in its lifecycle.
///
/// `ToolExecution`/`WaitingToolConfirmation` are folded into the tool
/// scheduler's own per-call [`relay_types::ToolCallStatus`] machine in this
/// implementation — the Turn only observes `ToolExecution` as a single
/// block while the scheduler runs a batch to completion — but the state
/// name is kept here for the transitions that are genuinely turn-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Pending,
    Running,
    Streaming,
    ToolExecution,
    ProcessingToolResults,
    Completed,
    Failed,
    Cancelled,
}

impl TurnState {
    /// Whether this state ends the turn — no further events will be emitted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}
