//! The Tool Scheduler (C4): per-call lifecycle, confirmation gating,
//! parallel execution, and submission-order-preserving completion (§4.4).

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::Utc;
use futures::future::join_all;
use relay_types::{
    CallId, ConfirmationDetails, ConfirmationOutcome, Part, ToolCall, ToolCallRequest, ToolCallStatus, ToolContext,
    ToolResult, ToolResultContent,
};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::cache::ConfirmationCache;
use crate::permission::{PermissionDecision, PermissionPolicy};
use crate::registry::ToolRegistry;

/// A pinned, boxed, `Send` future, matching the dyn-safe convention used
/// for the tool contract itself.
pub type HandlerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Presents a confirmation prompt to whatever is driving the turn (a CLI,
/// a UI, an auto-accept policy for headless runs) and awaits its outcome.
pub trait ConfirmationHandler: Send + Sync {
    /// Ask for a decision on one call.
    fn confirm<'a>(&'a self, call_id: &'a CallId, details: &'a ConfirmationDetails) -> HandlerFuture<'a, ConfirmationOutcome>;
}

/// Always answers [`ConfirmationOutcome::ProceedOnce`] — suitable for
/// headless/batch runs with no interactive confirmation surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ConfirmationHandler for AutoApprove {
    fn confirm<'a>(&'a self, _call_id: &'a CallId, _details: &'a ConfirmationDetails) -> HandlerFuture<'a, ConfirmationOutcome> {
        Box::pin(async { ConfirmationOutcome::ProceedOnce })
    }
}

/// Runs one batch of tool calls through the scheduler pipeline.
pub struct ToolScheduler<'a> {
    registry: &'a ToolRegistry,
    permission: &'a dyn PermissionPolicy,
    confirmation: &'a dyn ConfirmationHandler,
    cache: &'a dyn ConfirmationCache,
}

impl<'a> ToolScheduler<'a> {
    /// Build a scheduler over the given registry, permission policy,
    /// confirmation handler, and always-approve cache.
    #[must_use]
    pub fn new(
        registry: &'a ToolRegistry,
        permission: &'a dyn PermissionPolicy,
        confirmation: &'a dyn ConfirmationHandler,
        cache: &'a dyn ConfirmationCache,
    ) -> Self {
        Self {
            registry,
            permission,
            confirmation,
            cache,
        }
    }

    /// Run `requests` to completion (in parallel where possible) and
    /// return `FunctionResponse` parts in submission order — the list
    /// `onAllToolCallsComplete` hands back per §4.4's concurrency contract.
    pub async fn schedule_and_wait(
        &self,
        requests: Vec<ToolCallRequest>,
        cwd: &Path,
        session_id: &str,
        environment: &HashMap<String, String>,
        abort: &CancellationToken,
    ) -> Vec<Part> {
        let mut calls: Vec<ToolCall> = requests
            .into_iter()
            .map(|request| ToolCall::new(request, abort.child_token()))
            .collect();

        let session_id = session_id.to_string();
        let cwd = cwd.to_path_buf();
        let futures = calls
            .iter_mut()
            .map(|call| self.run_one(call, &cwd, &session_id, environment));
        join_all(futures).await;

        calls.iter().flat_map(to_function_response_parts).collect()
    }

    async fn run_one(&self, call: &mut ToolCall, cwd: &PathBuf, session_id: &str, environment: &HashMap<String, String>) {
        if call.cancel_flag.is_cancelled() {
            cancel(call);
            return;
        }

        let Some(tool) = self.registry.get(&call.tool_name).cloned() else {
            fail(call, format!("unknown tool '{}'", call.tool_name));
            return;
        };

        let params = Value::Object(call.args.clone());

        // 1. Validate
        if let Some(message) = tool.validate(&params) {
            fail(call, message);
            return;
        }

        // Permission gate, ahead of the per-call confirmation prompt.
        match self.permission.check(&call.tool_name, &params) {
            PermissionDecision::Deny(reason) => {
                fail(call, reason);
                return;
            }
            PermissionDecision::Allow | PermissionDecision::Ask(_) => {}
        }

        // 2. Confirmation query
        let command_root = command_root_of(&call.args);
        let already_approved = self.cache.is_approved(&call.tool_name, command_root.as_deref());
        if !already_approved {
            if let Some(details) = tool.should_confirm_execute(&params).await {
                call.status = ToolCallStatus::AwaitingApproval;
                call.confirmation_details = Some(details.clone());

                if call.cancel_flag.is_cancelled() {
                    cancel(call);
                    return;
                }

                let outcome = self.confirmation.confirm(&call.call_id, &details).await;
                match outcome {
                    ConfirmationOutcome::Cancel => {
                        cancel(call);
                        return;
                    }
                    ConfirmationOutcome::ProceedAlwaysForTool => {
                        self.cache.approve_tool(&call.tool_name);
                    }
                    ConfirmationOutcome::ProceedAlways => {
                        if let Some(root) = &command_root {
                            self.cache.approve_invocation(&call.tool_name, root);
                        }
                    }
                    ConfirmationOutcome::ProceedOnce | ConfirmationOutcome::ModifyWithEditor => {}
                }
            }
        }

        if call.cancel_flag.is_cancelled() {
            cancel(call);
            return;
        }

        // 3. Execute
        call.status = ToolCallStatus::Scheduled;
        call.status = ToolCallStatus::Executing;
        call.start_time = Some(Utc::now());

        let tool_ctx = ToolContext {
            cwd: cwd.clone(),
            session_id: session_id.to_string(),
            environment: environment.clone(),
            cancellation_token: call.cancel_flag.clone(),
            progress_reporter: None,
        };
        let result = tool.execute(&params, &tool_ctx).await;

        // 4. Complete
        call.end_time = Some(Utc::now());
        call.status = if call.cancel_flag.is_cancelled() && !result.success {
            ToolCallStatus::Cancelled
        } else if result.success {
            ToolCallStatus::Success
        } else {
            ToolCallStatus::Error
        };
        call.response = Some(result);
    }
}

fn fail(call: &mut ToolCall, message: impl Into<String>) {
    call.status = ToolCallStatus::Error;
    call.response = Some(ToolResult::failure(message));
    call.end_time = Some(Utc::now());
}

fn cancel(call: &mut ToolCall) {
    call.status = ToolCallStatus::Cancelled;
    call.response = Some(ToolResult::cancelled());
    call.end_time = Some(Utc::now());
}

/// The first whitespace-separated token of a shell-like tool's `command`
/// argument, used to scope `ProceedAlways` caching (§4.4 supplement).
fn command_root_of(args: &Map<String, Value>) -> Option<String> {
    args.get("command")
        .and_then(Value::as_str)
        .and_then(|cmd| cmd.split_whitespace().next())
        .map(str::to_string)
}

/// Convert one terminal `ToolCall` into its `FunctionResponse` part(s).
/// A `Parts` result treats its first element as the response wrapper and
/// appends the rest as additional parts (for returning media alongside text).
fn to_function_response_parts(call: &ToolCall) -> Vec<Part> {
    let response = call
        .response
        .as_ref()
        .expect("schedule_and_wait only reads terminal calls");

    let mut fields = Map::new();
    let mut extra_parts = Vec::new();
    match &response.llm_content {
        ToolResultContent::Text(text) => {
            fields.insert("output".to_string(), Value::String(text.clone()));
        }
        ToolResultContent::Parts(parts) => {
            if let Some(text) = parts.first().and_then(Part::as_text) {
                fields.insert("output".to_string(), Value::String(text.to_string()));
            }
            extra_parts.extend(parts.iter().skip(1).cloned());
        }
    }
    if let Some(error) = &response.error {
        fields.insert("error".to_string(), Value::String(error.clone()));
    }

    let mut parts = vec![Part::FunctionResponse {
        id: call.call_id.clone(),
        name: call.tool_name.clone(),
        response: fields,
    }];
    parts.append(&mut extra_parts);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryConfirmationCache;
    use crate::permission::AllowAllPolicy;
    use relay_types::ToolLocation;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    struct ListDirectory;

    impl relay_types::ToolDyn for ListDirectory {
        fn name(&self) -> &str {
            "list_directory"
        }
        fn display_name(&self) -> &str {
            "List Directory"
        }
        fn description(&self) -> &str {
            "lists a directory"
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
            "list_directory".to_string()
        }
        fn locations(&self, _params: &Value) -> Vec<ToolLocation> {
            Vec::new()
        }
        fn should_confirm_execute<'b>(
            &'b self,
            _params: &'b Value,
        ) -> HandlerFuture<'b, Option<ConfirmationDetails>> {
            Box::pin(async { None })
        }
        fn execute<'b>(&'b self, _params: &'b Value, _ctx: &'b ToolContext) -> HandlerFuture<'b, ToolResult> {
            Box::pin(async { ToolResult::success("a\nb") })
        }
    }

    struct SlowReadFile {
        delay_ms: u64,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        label: &'static str,
    }

    impl relay_types::ToolDyn for SlowReadFile {
        fn name(&self) -> &str {
            "read_file"
        }
        fn display_name(&self) -> &str {
            "Read File"
        }
        fn description(&self) -> &str {
            "reads a file"
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
            "read_file".to_string()
        }
        fn locations(&self, _params: &Value) -> Vec<ToolLocation> {
            Vec::new()
        }
        fn should_confirm_execute<'b>(
            &'b self,
            _params: &'b Value,
        ) -> HandlerFuture<'b, Option<ConfirmationDetails>> {
            Box::pin(async { None })
        }
        fn execute<'b>(&'b self, _params: &'b Value, _ctx: &'b ToolContext) -> HandlerFuture<'b, ToolResult> {
            let delay = self.delay_ms;
            let order = self.order.clone();
            let label = self.label;
            Box::pin(async move {
                sleep(Duration::from_millis(delay)).await;
                order.lock().unwrap().push(label);
                ToolResult::success("contents")
            })
        }
    }

    struct NeverFinishes;

    impl relay_types::ToolDyn for NeverFinishes {
        fn name(&self) -> &str {
            "slow_tool"
        }
        fn display_name(&self) -> &str {
            "Slow Tool"
        }
        fn description(&self) -> &str {
            "never returns until cancelled"
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
            "slow_tool".to_string()
        }
        fn locations(&self, _params: &Value) -> Vec<ToolLocation> {
            Vec::new()
        }
        fn should_confirm_execute<'b>(
            &'b self,
            _params: &'b Value,
        ) -> HandlerFuture<'b, Option<ConfirmationDetails>> {
            Box::pin(async { None })
        }
        fn execute<'b>(&'b self, _params: &'b Value, ctx: &'b ToolContext) -> HandlerFuture<'b, ToolResult> {
            Box::pin(async move {
                ctx.cancellation_token.cancelled().await;
                ToolResult::cancelled()
            })
        }
    }

    fn request(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: CallId::from(id),
            name: name.to_string(),
            args: Map::new(),
            prompt_id: "prompt-1".to_string(),
        }
    }

    #[tokio::test]
    async fn single_tool_round_trip_produces_a_matching_function_response() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ListDirectory));
        let permission = AllowAllPolicy;
        let confirmation = AutoApprove;
        let cache = InMemoryConfirmationCache::new();
        let scheduler = ToolScheduler::new(&registry, &permission, &confirmation, &cache);

        let parts = scheduler
            .schedule_and_wait(
                vec![request("c1", "list_directory")],
                Path::new("/"),
                "session-1",
                &HashMap::new(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(parts.len(), 1);
        match &parts[0] {
            Part::FunctionResponse { id, name, response } => {
                assert_eq!(id, &CallId::from("c1"));
                assert_eq!(name, "list_directory");
                assert_eq!(response.get("output").and_then(Value::as_str), Some("a\nb"));
            }
            other => panic!("expected a FunctionResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parallel_batch_preserves_submission_order_despite_reversed_completion() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = ToolRegistry::new();
        // c2 finishes before c1 despite being submitted second.
        registry.register(Arc::new(SlowReadFile {
            delay_ms: 30,
            order: order.clone(),
            label: "c1",
        }));

        let permission = AllowAllPolicy;
        let confirmation = AutoApprove;
        let cache = InMemoryConfirmationCache::new();
        let scheduler = ToolScheduler::new(&registry, &permission, &confirmation, &cache);

        let parts = scheduler
            .schedule_and_wait(
                vec![request("c1", "read_file"), request("c2", "read_file")],
                Path::new("/"),
                "session-1",
                &HashMap::new(),
                &CancellationToken::new(),
            )
            .await;

        let ids: Vec<_> = parts
            .iter()
            .map(|p| match p {
                Part::FunctionResponse { id, .. } => id.to_string(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn cancellation_mid_execution_produces_synthetic_error_responses() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NeverFinishes));
        let permission = AllowAllPolicy;
        let confirmation = AutoApprove;
        let cache = InMemoryConfirmationCache::new();
        let scheduler = ToolScheduler::new(&registry, &permission, &confirmation, &cache);
        let abort = CancellationToken::new();

        let abort_clone = abort.clone();
        let run = scheduler.schedule_and_wait(
            vec![request("c1", "slow_tool")],
            Path::new("/"),
            "session-1",
            &HashMap::new(),
            &abort,
        );
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("should not finish before cancellation"),
            _ = sleep(Duration::from_millis(10)) => {
                abort_clone.cancel();
            }
        }

        let parts = run.await;
        assert_eq!(parts.len(), 1);
        match &parts[0] {
            Part::FunctionResponse { response, .. } => {
                assert_eq!(
                    response.get("error").and_then(Value::as_str),
                    Some("Operation cancelled by user")
                );
            }
            other => panic!("expected a FunctionResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn already_approved_invocation_skips_confirmation() {
        let counter = Arc::new(AtomicUsize::new(0));
        let _ = counter.clone();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ListDirectory));
        let permission = AllowAllPolicy;
        let confirmation = AutoApprove;
        let cache = InMemoryConfirmationCache::new();
        cache.approve_tool("list_directory");
        let scheduler = ToolScheduler::new(&registry, &permission, &confirmation, &cache);

        let parts = scheduler
            .schedule_and_wait(
                vec![request("c1", "list_directory")],
                Path::new("/"),
                "session-1",
                &HashMap::new(),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(parts.len(), 1);
    }
}
