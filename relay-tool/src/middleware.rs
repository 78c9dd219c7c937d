//! Axum-style middleware chain wrapping tool execution.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use relay_types::{ToolContext, ToolDyn, ToolResult};
use serde_json::Value;

/// A pinned, boxed, `Send` future — the dyn-safe boundary for the chain.
pub type ToolFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One link in the chain wrapping a tool's `execute`.
///
/// Implementations call `next.run(...)` to continue the chain (or the
/// tool itself, once `next` is empty), optionally inspecting or rewriting
/// the result on the way back out.
pub trait ToolMiddleware: Send + Sync {
    /// Process one call, delegating to `next` to continue the chain.
    fn process<'a>(
        &'a self,
        tool: &'a dyn ToolDyn,
        params: &'a Value,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> ToolFuture<'a, ToolResult>;
}

/// The remaining portion of a middleware chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn ToolMiddleware>],
}

impl<'a> Next<'a> {
    /// Build a `Next` over the full chain, to start a run.
    #[must_use]
    pub fn new(chain: &'a [Arc<dyn ToolMiddleware>]) -> Self {
        Self { chain }
    }

    /// Run the next middleware in the chain, or the tool itself once the
    /// chain is exhausted.
    pub fn run(self, tool: &'a dyn ToolDyn, params: &'a Value, ctx: &'a ToolContext) -> ToolFuture<'a, ToolResult> {
        match self.chain.split_first() {
            Some((first, rest)) => first.process(tool, params, ctx, Next { chain: rest }),
            None => tool.execute(params, ctx),
        }
    }
}

type MiddlewareFnInner =
    dyn for<'a> Fn(&'a dyn ToolDyn, &'a Value, &'a ToolContext, Next<'a>) -> ToolFuture<'a, ToolResult> + Send + Sync;

/// Adapts a plain function into a [`ToolMiddleware`].
pub struct MiddlewareFn(Box<MiddlewareFnInner>);

impl ToolMiddleware for MiddlewareFn {
    fn process<'a>(
        &'a self,
        tool: &'a dyn ToolDyn,
        params: &'a Value,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> ToolFuture<'a, ToolResult> {
        (self.0)(tool, params, ctx, next)
    }
}

/// Build a [`ToolMiddleware`] from a closure, rather than a named type.
pub fn tool_middleware_fn<F>(f: F) -> MiddlewareFn
where
    F: for<'a> Fn(&'a dyn ToolDyn, &'a Value, &'a ToolContext, Next<'a>) -> ToolFuture<'a, ToolResult>
        + Send
        + Sync
        + 'static,
{
    MiddlewareFn(Box::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::{ToolLocation, ToolResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn display_name(&self) -> &str {
            "Echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
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
            "echo".to_string()
        }
        fn locations(&self, _params: &Value) -> Vec<ToolLocation> {
            Vec::new()
        }
        fn should_confirm_execute<'a>(
            &'a self,
            _params: &'a Value,
        ) -> ToolFuture<'a, Option<relay_types::ConfirmationDetails>> {
            Box::pin(async { None })
        }
        fn execute<'a>(&'a self, _params: &'a Value, _ctx: &'a ToolContext) -> ToolFuture<'a, ToolResult> {
            Box::pin(async { ToolResult::success("echoed") })
        }
    }

    #[tokio::test]
    async fn empty_chain_calls_the_tool_directly() {
        let tool = EchoTool;
        let ctx = ToolContext::default();
        let result = Next::new(&[]).run(&tool, &Value::Null, &ctx).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn middleware_runs_in_registration_order_around_the_call() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let counter = Arc::new(AtomicUsize::new(0));

        let make = |label: &'static str, order: Arc<std::sync::Mutex<Vec<&'static str>>>| {
            Arc::new(tool_middleware_fn(move |tool, params, ctx, next| {
                let order = order.clone();
                Box::pin(async move {
                    order.lock().unwrap().push(label);
                    let result = next.run(tool, params, ctx).await;
                    order.lock().unwrap().push(label);
                    result
                })
            })) as Arc<dyn ToolMiddleware>
        };

        let chain = vec![make("outer", order.clone()), make("inner", order.clone())];
        let tool = EchoTool;
        let ctx = ToolContext::default();
        let _ = counter.fetch_add(1, Ordering::SeqCst);
        let result = Next::new(&chain).run(&tool, &Value::Null, &ctx).await;

        assert!(result.success);
        assert_eq!(*order.lock().unwrap(), vec!["outer", "inner", "inner", "outer"]);
    }
}
