#![doc = include_str!("../README.md")]

pub mod cache;
pub mod middleware;
pub mod permission;
pub mod registry;
pub mod scheduler;

pub use cache::{ConfirmationCache, InMemoryConfirmationCache};
pub use middleware::{tool_middleware_fn, MiddlewareFn, Next, ToolFuture, ToolMiddleware};
pub use permission::{AllowAllPolicy, AllowedToolsPolicy, PermissionDecision, PermissionPolicy};
pub use registry::ToolRegistry;
pub use scheduler::{AutoApprove, ConfirmationHandler, HandlerFuture, ToolScheduler};
