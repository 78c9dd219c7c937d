#![doc = include_str!("../README.md")]

#[cfg(feature = "core")]
pub use relay_context;
#[cfg(feature = "core")]
pub use relay_retry;
#[cfg(feature = "core")]
pub use relay_tool;
#[cfg(feature = "core")]
pub use relay_turn;
#[cfg(feature = "core")]
pub use relay_types;

#[cfg(feature = "orch")]
pub use relay_orch;

#[cfg(any(feature = "provider-gemini", feature = "provider-openai"))]
pub use relay_provider;
#[cfg(feature = "provider-gemini")]
pub use relay_provider_gemini;
#[cfg(feature = "provider-openai")]
pub use relay_provider_openai;

/// Happy-path imports for composing relay conversations.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use relay_types::{
        CallId, Candidate, CompletionRequest, ContextStrategy, ErrorKind, Message, Part, Provider,
        ProviderError, ProviderResponse, Role, StreamHandle, SystemPrompt, ToolCallRequest,
        ToolDefinition, Usage,
    };

    #[cfg(feature = "core")]
    pub use relay_context::{
        prepare_messages_for_generation, AutoCompressThreshold, CompressionDiagnostic,
        CompressionStrategy, SlidingWindowStrategy, SummarizeMiddleStrategy, TokenCounter,
        TruncateOldestStrategy,
    };

    #[cfg(feature = "core")]
    pub use relay_tool::{
        AllowAllPolicy, AllowedToolsPolicy, ConfirmationCache, ConfirmationHandler,
        InMemoryConfirmationCache, PermissionPolicy, ToolRegistry, ToolScheduler,
    };

    #[cfg(feature = "core")]
    pub use relay_retry::{retry, RetryConfig, RetryStats, RetryStrategy};

    #[cfg(feature = "core")]
    pub use relay_turn::{Turn, TurnConfig, TurnEvent, TurnOutcome, TurnState};

    #[cfg(feature = "orch")]
    pub use relay_orch::{RelayConfig, Session, SessionStats, SubagentRegistry};

    #[cfg(feature = "provider-gemini")]
    pub use relay_provider_gemini::GeminiProvider;

    #[cfg(feature = "provider-openai")]
    pub use relay_provider_openai::OpenAiCompatibleProvider;
}
