//! The Turn Engine's output event union (§4.5).

use relay_types::{ConfirmationDetails, Part, ToolCallRequest};

/// One event on a Turn's output sequence.
///
/// `Thought` and `ToolCallConfirmation` are defined for interface parity
/// with the full tagged union but are never emitted by this
/// implementation: the neutral [`relay_types::Part`] union carries no
/// "thought" variant, and confirmation prompts are resolved entirely
/// inside the tool scheduler's [`relay_tool::ConfirmationHandler`] rather
/// than surfaced as a Turn-level event.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// A text chunk emitted by the model.
    Content(String),
    /// The model requested a tool call.
    ToolCallRequest(ToolCallRequest),
    /// A tool call's result, ready to feed back to the model.
    ToolCallResponse(Part),
    /// Never emitted; see the type-level note.
    ToolCallConfirmation(ConfirmationDetails),
    /// Never emitted; see the type-level note.
    Thought(String),
    /// History was compressed mid-turn.
    ChatCompressed {
        original_tokens: usize,
        compressed_tokens: usize,
    },
    /// A non-recoverable error terminated the turn.
    Error(String),
    /// The turn completed normally.
    Finished { iterations: usize },
    /// The user (or caller) cancelled the turn.
    UserCancelled { reason: String },
    /// The turn's own runaway-loop guard fired.
    MaxSessionTurns { iterations: usize },
    /// The same tool call repeated identically too many times in a row.
    LoopDetected { tool_name: String },
}
