//! Capability traits: `Provider`, `ToolDyn`, `ContextStrategy`.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::error::{ContextError, ProviderError};
use crate::stream::StreamHandle;
use crate::types::{
    CompletionRequest, ConfirmationDetails, Message, ProviderResponse, ToolContext,
    ToolDefinition, ToolResult,
};
use crate::wasm::{WasmCompatSend, WasmCompatSync};

/// Uniform interface every concrete LLM adapter implements (§4.1).
///
/// Uses RPITIT (return-position `impl Trait` in traits) for native async
/// without boxing every call; the trait is therefore not object-safe by
/// design. Compose over it with `<P: Provider>` generics; where a
/// heterogeneous collection of providers is genuinely needed (e.g. a
/// model-fallback table), erase it behind a small dyn-safe wrapper at that
/// call site rather than making `Provider` itself object-safe.
pub trait Provider: WasmCompatSend + WasmCompatSync {
    /// One-time setup (credential checks, client construction). Adapters
    /// that need no setup may implement this as a no-op.
    fn initialize(&self) -> impl Future<Output = Result<(), ProviderError>> + WasmCompatSend;

    /// Send a request and await the complete response.
    fn generate_content(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + WasmCompatSend;

    /// Send a request and get a stream of response chunks.
    ///
    /// Per §4.1.3, implementations MAY either (a) accumulate per-call
    /// argument fragments and emit one complete `FunctionCall` part per
    /// chunk group, or (b) internally call the non-streaming endpoint and
    /// yield its result as a single chunk. Either is valid; (a) must never
    /// expose partially-parsed arguments to the caller.
    fn generate_content_stream(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<StreamHandle, ProviderError>> + WasmCompatSend;

    /// Estimate (or exactly count) the tokens in `messages` for this model.
    fn count_tokens(&self, messages: &[Message]) -> usize;

    /// The model's context window, in tokens.
    fn context_limit(&self) -> usize;

    /// Whether this adapter actually streams, or always falls back to the
    /// non-streaming path internally (e.g. OpenAI-style with tools enabled).
    fn supports_streaming(&self) -> bool;
}

/// A location referenced by a tool call (e.g. a file/line a `read_file` or
/// `edit` call touched), returned by [`ToolDyn::locations`].
#[derive(Debug, Clone)]
pub struct ToolLocation {
    /// Path touched.
    pub path: String,
    /// Line number, if applicable.
    pub line: Option<u32>,
    /// Column number, if applicable.
    pub column: Option<u32>,
}

/// A pinned, boxed, `Send` future — the dyn-safe boundary for the
/// naturally-async [`ToolDyn`] methods.
type ToolFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe tool contract (§6.1): the core's southbound interface.
///
/// Tools are registered once per process as `Arc<dyn ToolDyn>`; the set is
/// immutable during a turn. Async methods are hand-boxed (rather than via
/// `async-trait`) to keep the vtable shape explicit and match the
/// boxed-future convention used elsewhere for dyn-safe async boundaries.
pub trait ToolDyn: WasmCompatSend + WasmCompatSync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON-Schema subset describing the tool's parameters.
    fn schema(&self) -> Value;

    /// Whether the tool only reads state (never mutates).
    fn is_read_only(&self) -> bool;

    /// Whether the tool can stream incremental output while it executes.
    fn can_stream_output(&self) -> bool;

    /// The static descriptor for this tool, as sent to providers.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            display_name: self.display_name().to_string(),
            description: self.description().to_string(),
            schema: self.schema(),
            is_read_only: self.is_read_only(),
            can_stream_output: self.can_stream_output(),
            annotations: None,
        }
    }

    /// Validate `params` against this tool's expectations; `Some(message)`
    /// on failure.
    fn validate(&self, params: &Value) -> Option<String>;

    /// A one-line human-readable description of what this call will do,
    /// given its arguments (used to build confirmation prompts).
    fn describe(&self, params: &Value) -> String;

    /// Filesystem (or other) locations this call will touch, for
    /// diff/preview UIs.
    fn locations(&self, params: &Value) -> Vec<ToolLocation>;

    /// Whether this call needs confirmation before running, and if so,
    /// the details to show.
    fn should_confirm_execute<'a>(
        &'a self,
        params: &'a Value,
    ) -> ToolFuture<'a, Option<ConfirmationDetails>>;

    /// Run the tool.
    fn execute<'a>(&'a self, params: &'a Value, ctx: &'a ToolContext) -> ToolFuture<'a, ToolResult>;
}

/// Context-window management strategy (§4.3): decide when compaction is
/// needed and perform it.
///
/// RPITIT async, same non-object-safety tradeoff as [`Provider`]; crates
/// needing a heterogeneous collection of strategies (e.g. a composite
/// fallback chain) erase this behind a small dyn-safe wrapper at that call
/// site (see `relay-context::strategies::BoxedStrategy`).
pub trait ContextStrategy: WasmCompatSend + WasmCompatSync {
    /// Whether `messages` (whose estimated token count is `token_count`)
    /// should be compacted.
    fn should_compact(&self, messages: &[Message], token_count: usize) -> bool;

    /// Compact `messages`, preserving conversation well-formedness (§3).
    fn compact(
        &self,
        messages: Vec<Message>,
    ) -> impl Future<Output = Result<Vec<Message>, ContextError>> + WasmCompatSend;

    /// Estimate the token count of `messages` under this strategy's model.
    fn token_estimate(&self, messages: &[Message]) -> usize;
}
