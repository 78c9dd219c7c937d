//! Core message, tool, and provider-response types.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::wasm::{WasmCompatSend, WasmCompatSync};

/// The role of a message participant.
///
/// `Tool` carries function-response parts back to the model; providers
/// that don't distinguish it from `User` (OpenAI-style `role:"tool"`
/// messages aside) fold it into their own wire role at the adapter
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A human user.
    User,
    /// The model itself.
    Model,
    /// A tool's response, fed back to the model.
    Tool,
    /// A system message.
    System,
}

/// A single piece of message content.
///
/// Every provider-specific wire shape (Gemini `functionCall`/`functionResponse`,
/// OpenAI `tool_calls`/`role:"tool"`) funnels through this union at the
/// adapter boundary, so the history well-formedness invariant can be
/// checked structurally instead of by string-matching provider JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Part {
    /// Plain text content.
    Text(String),
    /// A tool-invocation request emitted by the model.
    FunctionCall {
        /// Identifier for this call; echoed unchanged in the matching response.
        id: CallId,
        /// Name of the tool to invoke.
        name: String,
        /// JSON object of arguments.
        args: Map<String, Value>,
    },
    /// A tool's result, fed back to the model.
    FunctionResponse {
        /// Matches the originating `FunctionCall.id`.
        id: CallId,
        /// Name of the tool that produced this response.
        name: String,
        /// JSON object carrying the result (or `{"error": ...}`).
        response: Map<String, Value>,
    },
    /// Inline binary media (base64-encoded on the wire).
    InlineData {
        /// MIME type, e.g. `"image/png"`.
        mime_type: String,
        /// Base64-encoded payload.
        bytes: String,
    },
    /// A reference to out-of-band media.
    FileData {
        /// MIME type of the referenced file.
        mime_type: String,
        /// URI where the file can be fetched.
        uri: String,
    },
}

impl Part {
    /// Borrow the text if this part is `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this part is a `FunctionCall`.
    #[must_use]
    pub fn is_function_call(&self) -> bool {
        matches!(self, Self::FunctionCall { .. })
    }

    /// The call id, if this part carries one.
    #[must_use]
    pub fn call_id(&self) -> Option<&CallId> {
        match self {
            Self::FunctionCall { id, .. } | Self::FunctionResponse { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// A message in a conversation: a role plus an ordered sequence of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The content parts of this message, in emission order.
    pub parts: Vec<Part>,
}

impl Message {
    /// Build a message from a role and parts.
    #[must_use]
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// A `User` message with a single text part.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::Text(text.into())])
    }

    /// A `Model` message with a single text part.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::Text(text.into())])
    }

    /// A `System` message with a single text part.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![Part::Text(text.into())])
    }

    /// A `Model` message carrying one `FunctionCall` part per request.
    ///
    /// Used by the Turn Engine to append the model's own call message to
    /// history before the matching tool-response message — see the
    /// ordering invariant in [`crate::types::Message`]'s module docs.
    #[must_use]
    pub fn model_function_calls(calls: Vec<Part>) -> Self {
        debug_assert!(calls.iter().all(Part::is_function_call));
        Self::new(Role::Model, calls)
    }

    /// Concatenate all `Text` parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// All `FunctionCall` parts, in order.
    pub fn function_calls(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.is_function_call())
    }
}

/// A newtype over the identifier the model emits for a function call, or
/// the synthetic id assigned when it omits one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub String);

impl CallId {
    /// Synthesize a call id of the form `"<name>-<unix_ms>-<hex6>"`.
    ///
    /// Matches one of the two schemes the source implementation uses
    /// (the other is `call_NNN`-style); either is acceptable as long as
    /// ids are unique within a turn and stable from request to response.
    #[must_use]
    pub fn synthesize(tool_name: &str, unix_ms: u128, random_hex6: &str) -> Self {
        Self(format!("{tool_name}-{unix_ms}-{random_hex6}"))
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A duration expressed in whole milliseconds, for fields that cross a
/// serde boundary (`Retry-After`, tool execution time, request timeouts)
/// where a plain integer is the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMs(pub u64);

impl DurationMs {
    /// Zero milliseconds.
    pub const ZERO: Self = Self(0);

    /// As a [`std::time::Duration`].
    #[must_use]
    pub fn as_duration(self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0)
    }
}

impl From<std::time::Duration> for DurationMs {
    fn from(d: std::time::Duration) -> Self {
        Self(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for DurationMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// --- Tool descriptor ---

/// Behavioral annotations for a tool (mirrors the MCP tool-annotation shape).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolAnnotations {
    /// The tool only reads state, never mutates it.
    pub read_only_hint: Option<bool>,
    /// The tool performs a destructive operation (delete, overwrite, …).
    pub destructive_hint: Option<bool>,
    /// Repeated calls with the same arguments produce the same result.
    pub idempotent_hint: Option<bool>,
    /// The tool talks to something outside the process (network, disk, …).
    pub open_world_hint: Option<bool>,
}

/// Static description of a callable tool, as registered once per process.
///
/// The tool set is immutable during a turn (§3): a [`crate::traits::ToolDyn`]
/// implementation is paired with exactly one `ToolDefinition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON-Schema subset describing the tool's parameters.
    pub schema: Value,
    /// Whether the tool only reads state.
    pub is_read_only: bool,
    /// Whether the tool can stream incremental output while executing.
    pub can_stream_output: bool,
    /// Optional behavioral annotations.
    pub annotations: Option<ToolAnnotations>,
}

/// Runtime context handed to a tool at execution time.
pub struct ToolContext {
    /// Working directory for relative-path resolution.
    pub cwd: PathBuf,
    /// The owning session's identifier.
    pub session_id: String,
    /// Environment variables visible to the tool.
    pub environment: HashMap<String, String>,
    /// Cooperative cancellation token; the scheduler sets it on abort.
    pub cancellation_token: CancellationToken,
    /// Optional live-output sink for tools with `can_stream_output`.
    pub progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/tmp")),
            session_id: String::new(),
            environment: HashMap::new(),
            cancellation_token: CancellationToken::new(),
            progress_reporter: None,
        }
    }
}

/// Sink for a tool's incremental output while it executes.
pub trait ProgressReporter: WasmCompatSend + WasmCompatSync {
    /// Forward a chunk of live output for the given call.
    fn report(&self, call_id: &CallId, chunk: &str);
}

/// The result a tool hands back to the scheduler.
///
/// `llm_content` becomes the `FunctionResponse.response` payload: a raw
/// string is wrapped as `{"output": <string>}`; a part list treats its
/// first element as the response wrapper and appends the rest as
/// additional parts (for media).
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Content returned to the model.
    pub llm_content: ToolResultContent,
    /// Optional content for display to the user (may differ from `llm_content`).
    pub return_display: Option<String>,
    /// Whether this result represents a failure.
    pub success: bool,
    /// Error detail, if `success` is false.
    pub error: Option<String>,
}

/// The two shapes a tool's `llm_content` may take.
#[derive(Debug, Clone)]
pub enum ToolResultContent {
    /// A raw string, wrapped as `{"output": <string>}`.
    Text(String),
    /// A list of parts; the first is the response wrapper, the rest are
    /// appended as additional parts (used for returning media).
    Parts(Vec<Part>),
}

impl ToolResult {
    /// A successful result carrying plain text.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            llm_content: ToolResultContent::Text(text.into()),
            return_display: None,
            success: true,
            error: None,
        }
    }

    /// A failed result carrying an error message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            llm_content: ToolResultContent::Text(message.clone()),
            return_display: None,
            success: false,
            error: Some(message),
        }
    }

    /// The synthetic result used when a call is cancelled before it runs,
    /// or aborted mid-flight: every outstanding call still gets a matching
    /// response so history stays well-formed (§5).
    #[must_use]
    pub fn cancelled() -> Self {
        Self::failure("Operation cancelled by user")
    }
}

// --- Tool-call scheduler entity ---

/// Lifecycle state of one scheduled tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Parameter validation in progress.
    Validating,
    /// Waiting on a confirmation outcome from the handler.
    AwaitingApproval,
    /// Validated and confirmed (or confirmation not required); queued to run.
    Scheduled,
    /// Actively executing.
    Executing,
    /// Completed successfully.
    Success,
    /// Completed with an error.
    Error,
    /// Cancelled before or during execution.
    Cancelled,
}

impl ToolCallStatus {
    /// Whether this status is terminal (no further transitions occur).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancelled)
    }
}

/// The kind of operation a tool is about to perform, used to pick a
/// confirmation prompt shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    /// Shell/process execution.
    Exec,
    /// A file edit (diff-able).
    Edit,
    /// A file write (new content, no prior diff).
    Write,
    /// Anything else requiring a yes/no gate.
    Generic,
}

/// Details shown to the confirmation handler before a tool runs.
#[derive(Debug, Clone)]
pub struct ConfirmationDetails {
    /// The prompt shape to render.
    pub kind: ConfirmationKind,
    /// Short title.
    pub title: String,
    /// Longer description of what's about to happen.
    pub description: String,
    /// The command (for `Exec`) or diff (for `Edit`) being confirmed, if any.
    pub command_or_diff: Option<String>,
}

/// The user's (or an auto-confirm policy's) response to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Proceed with this one call only.
    ProceedOnce,
    /// Proceed and remember the decision for this exact invocation shape
    /// (tool name + command root) for the rest of the process.
    ProceedAlways,
    /// Proceed and remember the decision for every future call to this tool.
    ProceedAlwaysForTool,
    /// The user edited the proposed change before proceeding.
    ModifyWithEditor,
    /// Abort this call.
    Cancel,
}

/// A tool-invocation request as emitted by the model (or reconstructed
/// from streamed fragments), before scheduling.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// The call id (model-assigned or synthesized).
    pub id: CallId,
    /// The tool name.
    pub name: String,
    /// JSON arguments.
    pub args: Map<String, Value>,
    /// The prompt id of the turn that produced this request.
    pub prompt_id: String,
}

/// One tool invocation's full lifecycle record, owned by the scheduler
/// for the duration of a single turn.
pub struct ToolCall {
    /// The call id.
    pub call_id: CallId,
    /// The tool name.
    pub tool_name: String,
    /// JSON arguments.
    pub args: Map<String, Value>,
    /// Current lifecycle state.
    pub status: ToolCallStatus,
    /// The originating request.
    pub request: ToolCallRequest,
    /// The result, once terminal.
    pub response: Option<ToolResult>,
    /// Confirmation prompt details, if confirmation was required.
    pub confirmation_details: Option<ConfirmationDetails>,
    /// Incrementally accumulated live output, for streaming tools.
    pub live_output: Option<String>,
    /// When execution began.
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// When the call reached a terminal state.
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Set by the scheduler when an abort signal fires.
    pub cancel_flag: CancellationToken,
}

impl ToolCall {
    /// Start a new call in the `Validating` state.
    #[must_use]
    pub fn new(request: ToolCallRequest, cancel_flag: CancellationToken) -> Self {
        Self {
            call_id: request.id.clone(),
            tool_name: request.name.clone(),
            args: request.args.clone(),
            status: ToolCallStatus::Validating,
            request,
            response: None,
            confirmation_details: None,
            live_output: None,
            start_time: None,
            end_time: None,
            cancel_flag,
        }
    }
}

// --- Completion request/response types (provider-adapter boundary) ---

/// System prompt configuration passed to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SystemPrompt {
    /// A single text block.
    Text(String),
    /// Structured blocks (for providers that support prompt-caching segments).
    Blocks(Vec<SystemBlock>),
}

/// One block of a structured system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    /// The block's text.
    pub text: String,
    /// Optional cache-control hint for this block.
    pub cache_control: Option<CacheControl>,
}

/// Prompt-caching hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheControl {
    /// Requested cache lifetime.
    pub ttl: Option<CacheTtl>,
}

/// Supported cache lifetimes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CacheTtl {
    /// Five minutes.
    FiveMinutes,
    /// One hour.
    OneHour,
}

/// Tool-selection strategy requested of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    Auto,
    /// The model must not call a tool.
    None,
    /// The model must call at least one tool.
    Required,
    /// The model must call the named tool.
    Specific {
        /// Required tool name.
        name: String,
    },
}

/// A completion request to a provider (the neutral request shape C1 maps
/// onto Gemini/OpenAI-style wire formats).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Canonical model name.
    pub model: String,
    /// Conversation history, oldest first.
    pub messages: Vec<Message>,
    /// Optional system prompt.
    pub system: Option<SystemPrompt>,
    /// Tools available to the model this turn.
    pub tools: Vec<ToolDefinition>,
    /// Tool-selection strategy.
    pub tool_choice: Option<ToolChoice>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<usize>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,
    /// Top-k sampling parameter (Gemini-specific; ignored by OpenAI-style adapters).
    pub top_k: Option<u32>,
    /// Sequences that stop generation.
    pub stop_sequences: Vec<String>,
    /// Whether to use the streaming endpoint.
    pub stream: bool,
}

/// One candidate in a provider response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// The candidate's message.
    pub content: Message,
    /// Why generation stopped, if known.
    pub finish_reason: Option<String>,
}

/// Token-usage accounting for a single provider call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    pub prompt: usize,
    /// Completion tokens.
    pub completion: usize,
    /// Total tokens (prompt + completion; providers may report this
    /// directly rather than as a derived sum).
    pub total: usize,
}

/// The neutral response shape every provider adapter normalizes onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Response candidates (almost always exactly one).
    pub candidates: Vec<Candidate>,
    /// Token usage, if the provider reported it.
    pub usage: Option<Usage>,
    /// Identifies which concrete provider produced this response.
    pub provider_tag: String,
}

impl ProviderResponse {
    /// Concatenated `Text` parts of the first candidate.
    #[must_use]
    pub fn text(&self) -> String {
        self.candidates.first().map(Message::text).unwrap_or_default()
    }

    /// The `FunctionCall` parts of the first candidate, each carrying its
    /// original id.
    pub fn function_calls(&self) -> Vec<&Part> {
        self.candidates
            .first()
            .map(|c| c.content.function_calls().collect())
            .unwrap_or_default()
    }
}

/// Resource ceilings enforced by the Orchestrator/Turn Engine across a
/// session or a turn. All limits are optional; only set ones are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageLimits {
    /// Maximum provider requests.
    pub request_limit: Option<usize>,
    /// Maximum tool calls across all turns.
    pub tool_calls_limit: Option<usize>,
    /// Maximum input tokens across all turns.
    pub input_tokens_limit: Option<usize>,
    /// Maximum output tokens across all turns.
    pub output_tokens_limit: Option<usize>,
    /// Maximum total tokens across all turns.
    pub total_tokens_limit: Option<usize>,
}

impl UsageLimits {
    /// Set the request limit.
    #[must_use]
    pub fn with_request_limit(mut self, limit: usize) -> Self {
        self.request_limit = Some(limit);
        self
    }

    /// Set the tool-call limit.
    #[must_use]
    pub fn with_tool_calls_limit(mut self, limit: usize) -> Self {
        self.tool_calls_limit = Some(limit);
        self
    }

    /// Set the total-token limit.
    #[must_use]
    pub fn with_total_tokens_limit(mut self, limit: usize) -> Self {
        self.total_tokens_limit = Some(limit);
        self
    }
}

impl From<String> for SystemPrompt {
    fn from(s: String) -> Self {
        SystemPrompt::Text(s)
    }
}

impl From<&str> for SystemPrompt {
    fn from(s: &str) -> Self {
        SystemPrompt::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_concatenates_only_text_parts() {
        let msg = Message::new(
            Role::Model,
            vec![
                Part::Text("hello".into()),
                Part::FunctionCall {
                    id: "c1".into(),
                    name: "foo".into(),
                    args: Map::new(),
                },
                Part::Text(" world".into()),
            ],
        );
        assert_eq!(msg.text(), "hello world");
        assert_eq!(msg.function_calls().count(), 1);
    }

    #[test]
    fn call_id_synthesize_matches_scheme() {
        let id = CallId::synthesize("list_directory", 1_700_000_000_000, "a1b2c3");
        assert_eq!(id.to_string(), "list_directory-1700000000000-a1b2c3");
    }

    #[test]
    fn tool_call_status_terminal_classification() {
        assert!(ToolCallStatus::Success.is_terminal());
        assert!(ToolCallStatus::Error.is_terminal());
        assert!(ToolCallStatus::Cancelled.is_terminal());
        assert!(!ToolCallStatus::Executing.is_terminal());
        assert!(!ToolCallStatus::AwaitingApproval.is_terminal());
    }

    #[test]
    fn cancelled_tool_result_is_a_synthetic_error() {
        let result = ToolResult::cancelled();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Operation cancelled by user"));
    }
}
