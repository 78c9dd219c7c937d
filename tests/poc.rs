//! Workspace-level proof of concept: drives the full relay stack end to
//! end without any live API keys, using mock providers.
//!
//! Demonstrates:
//! 1. A complete `Session` turn with a tool round trip.
//! 2. Provider swap — the same `RelayConfig`/tool set driven through two
//!    differently-shaped mock providers.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures::stream;
use relay_orch::{RelayConfig, Session};
use relay_tool::ToolRegistry;
use relay_turn::TurnEvent;
use relay_types::{
    CallId, Candidate, CompletionRequest, Message, Part, Provider, ProviderError, ProviderResponse,
    Role, StreamHandle, ToolContext, ToolDyn, ToolLocation, ToolResult,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// A provider that returns one queued response per call, in order: first a
/// tool call, then a final text answer.
struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self { responses: Mutex::new(responses.into_iter().rev().collect()) }
    }
}

impl Provider for ScriptedProvider {
    fn initialize(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        async { Ok(()) }
    }

    fn generate_content(
        &self,
        _request: CompletionRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        async { Err(ProviderError::Other("ScriptedProvider only supports streaming in this test".into())) }
    }

    fn generate_content_stream(
        &self,
        _request: CompletionRequest,
    ) -> impl Future<Output = Result<StreamHandle, ProviderError>> + Send {
        async move {
            let next = self.responses.lock().unwrap().pop().expect("ran out of scripted responses");
            Ok(StreamHandle::new(Box::pin(stream::iter(vec![next]))))
        }
    }

    fn count_tokens(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| m.text().len()).sum()
    }

    fn context_limit(&self) -> usize {
        1_000_000
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

fn text_response(text: &str) -> Result<ProviderResponse, ProviderError> {
    Ok(ProviderResponse {
        candidates: vec![Candidate {
            content: Message::new(Role::Model, vec![Part::Text(text.to_string())]),
            finish_reason: Some("STOP".to_string()),
        }],
        usage: None,
        provider_tag: "scripted".to_string(),
    })
}

fn call_response(name: &str) -> Result<ProviderResponse, ProviderError> {
    Ok(ProviderResponse {
        candidates: vec![Candidate {
            content: Message::new(
                Role::Model,
                vec![Part::FunctionCall { id: CallId::from("call-1"), name: name.to_string(), args: Default::default() }],
            ),
            finish_reason: Some("TOOL_CALLS".to_string()),
        }],
        usage: None,
        provider_tag: "scripted".to_string(),
    })
}

struct ListFilesTool;

impl ToolDyn for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }
    fn display_name(&self) -> &str {
        "List Files"
    }
    fn description(&self) -> &str {
        "lists files in the working directory"
    }
    fn schema(&self) -> Value {
        Value::Null
    }
    fn is_read_only(&self) -> bool {
        true
    }
    fn can_stream_output(&self) -> bool {
        false
    }
    fn validate(&self, _params: &Value) -> Option<String> {
        None
    }
    fn describe(&self, _params: &Value) -> String {
        "list_files".to_string()
    }
    fn locations(&self, _params: &Value) -> Vec<ToolLocation> {
        Vec::new()
    }
    fn should_confirm_execute<'a>(
        &'a self,
        _params: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Option<relay_types::ConfirmationDetails>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn execute<'a>(
        &'a self,
        _params: &'a Value,
        _ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send + 'a>> {
        Box::pin(async { ToolResult::success("readme.md\nsrc/") })
    }
}

fn registry_with_list_files() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ListFilesTool));
    registry
}

#[tokio::test]
async fn session_runs_a_full_tool_round_trip_turn() {
    let provider = ScriptedProvider::new(vec![call_response("list_files"), text_response("Here's what's there: readme.md, src/")]);
    let mut config = RelayConfig::new("kimi-k2-instruct");
    config.auto_confirm = true;
    config.system_prompt_template = "You are a helpful coding assistant.".to_string();

    let mut session = Session::new(
        provider,
        registry_with_list_files(),
        config,
        PathBuf::from("/workspace"),
        "session-poc-1",
        HashMap::new(),
    );

    let abort = CancellationToken::new();
    let events = session.send_message("What files are here?", &abort).await;

    assert!(events.iter().any(|e| matches!(e, TurnEvent::ToolCallRequest(_))));
    assert!(events.iter().any(|e| matches!(e, TurnEvent::ToolCallResponse(_))));
    assert!(matches!(events.last(), Some(TurnEvent::Finished { .. })));

    assert_eq!(session.stats().turns, 1);
    assert_eq!(session.stats().tool_calls, 1);
    assert_eq!(session.stats().successful_calls, 1);
    assert!((session.stats().success_rate() - 1.0).abs() < f64::EPSILON);

    // history: user msg, model function-call msg, tool result msg, final model text msg
    assert_eq!(session.history().len(), 4);
    let final_text = session.history().last().unwrap().text();
    assert!(final_text.contains("readme.md"));
}

/// A second mock provider shaped differently from `ScriptedProvider`
/// (always a single canned text reply), to exercise provider swap: the
/// same `Session::new` call site, only the type parameter changes.
struct EchoProvider {
    reply: String,
}

impl Provider for EchoProvider {
    fn initialize(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        async { Ok(()) }
    }

    fn generate_content(
        &self,
        _request: CompletionRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        let reply = self.reply.clone();
        async move { text_response(&reply) }
    }

    fn generate_content_stream(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<StreamHandle, ProviderError>> + Send {
        async move {
            let response = self.generate_content(request).await;
            Ok(StreamHandle::new(Box::pin(stream::iter(vec![response]))))
        }
    }

    fn count_tokens(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| m.text().len()).sum()
    }

    fn context_limit(&self) -> usize {
        32_000
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

async fn run_one_turn<P: Provider>(provider: P, cwd: &Path) -> Vec<TurnEvent> {
    let config = RelayConfig::new("some-model");
    let mut session = Session::new(provider, ToolRegistry::new(), config, cwd.to_path_buf(), "swap-test", HashMap::new());
    let abort = CancellationToken::new();
    session.send_message("hello", &abort).await
}

#[tokio::test]
async fn provider_swap_same_session_shape_different_backend() {
    let cwd = PathBuf::from("/workspace");

    let events_a = run_one_turn(EchoProvider { reply: "Hello from provider A".to_string() }, &cwd).await;
    let events_b = run_one_turn(
        ScriptedProvider::new(vec![text_response("Hello from provider B")]),
        &cwd,
    )
    .await;

    assert!(matches!(events_a.last(), Some(TurnEvent::Finished { .. })));
    assert!(matches!(events_b.last(), Some(TurnEvent::Finished { .. })));

    let text_a = events_a.iter().find_map(|e| match e {
        TurnEvent::Content(text) => Some(text.as_str()),
        _ => None,
    });
    let text_b = events_b.iter().find_map(|e| match e {
        TurnEvent::Content(text) => Some(text.as_str()),
        _ => None,
    });

    assert_eq!(text_a, Some("Hello from provider A"));
    assert_eq!(text_b, Some("Hello from provider B"));
}
