//! History-compression strategies (§4.3).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use relay_types::{ContextError, ContextStrategy, Message, Role, WasmCompatSend};

use crate::counter::TokenCounter;

/// A pure, synchronous compression strategy: given a message list and a
/// target token budget, return a (hopefully smaller) message list.
///
/// Kept synchronous and dyn-safe on purpose — unlike [`ContextStrategy`]
/// (the RPITIT async capability trait other crates implement against),
/// compression itself never needs to await anything.
pub trait CompressionStrategy: Send + Sync {
    /// Compress `messages` to fit within `target_tokens`, as estimated by `counter`.
    fn compress(&self, messages: &[Message], target_tokens: usize, counter: &TokenCounter) -> Vec<Message>;

    /// A short identifier for logging (`"truncate_oldest"`, `"sliding_window"`, …).
    fn name(&self) -> &'static str;
}

/// Preserve the last `preserve_recent` turn-pairs; add older messages back
/// in, newest-first, only while they still fit the target budget.
#[derive(Debug, Clone, Copy)]
pub struct TruncateOldestStrategy {
    /// Number of most-recent turn-pairs to always keep.
    pub preserve_recent: usize,
}

impl CompressionStrategy for TruncateOldestStrategy {
    fn compress(&self, messages: &[Message], target_tokens: usize, counter: &TokenCounter) -> Vec<Message> {
        let preserved_len = (self.preserve_recent * 2).min(messages.len());
        let split = messages.len() - preserved_len;
        let (older, recent) = messages.split_at(split);

        let mut kept: Vec<Message> = recent.to_vec();
        let mut total = counter.estimate_messages(&kept);

        for msg in older.iter().rev() {
            let cost = counter.estimate_message(msg);
            if total + cost > target_tokens {
                break;
            }
            kept.insert(0, msg.clone());
            total += cost;
        }
        kept
    }

    fn name(&self) -> &'static str {
        "truncate_oldest"
    }
}

/// Keep only the most recent messages that fit the budget, walking from
/// newest to oldest.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlidingWindowStrategy;

impl CompressionStrategy for SlidingWindowStrategy {
    fn compress(&self, messages: &[Message], target_tokens: usize, counter: &TokenCounter) -> Vec<Message> {
        let mut kept = Vec::new();
        let mut total = 0usize;
        for msg in messages.iter().rev() {
            let cost = counter.estimate_message(msg);
            if total + cost > target_tokens {
                break;
            }
            kept.push(msg.clone());
            total += cost;
        }
        kept.reverse();
        kept
    }

    fn name(&self) -> &'static str {
        "sliding_window"
    }
}

/// Keep the first and last `N` messages; replace the middle block with one
/// synthetic `System` message summarizing role counts. Falls back to
/// [`SlidingWindowStrategy`] if the result is still over budget.
#[derive(Debug, Clone, Copy)]
pub struct SummarizeMiddleStrategy {
    /// Messages kept at the start.
    pub keep_first: usize,
    /// Messages kept at the end.
    pub keep_last: usize,
}

impl CompressionStrategy for SummarizeMiddleStrategy {
    fn compress(&self, messages: &[Message], target_tokens: usize, counter: &TokenCounter) -> Vec<Message> {
        if messages.len() <= self.keep_first + self.keep_last {
            return messages.to_vec();
        }

        let first = &messages[..self.keep_first];
        let last = &messages[messages.len() - self.keep_last..];
        let middle = &messages[self.keep_first..messages.len() - self.keep_last];

        let mut user = 0usize;
        let mut model = 0usize;
        let mut tool = 0usize;
        let mut system = 0usize;
        for msg in middle {
            match msg.role {
                Role::User => user += 1,
                Role::Model => model += 1,
                Role::Tool => tool += 1,
                Role::System => system += 1,
            }
        }
        let summary = Message::system(format!(
            "[{} earlier messages omitted: {user} user, {model} model, {tool} tool, {system} system]",
            middle.len()
        ));

        let mut result = Vec::with_capacity(first.len() + 1 + last.len());
        result.extend_from_slice(first);
        result.push(summary);
        result.extend_from_slice(last);

        if counter.estimate_messages(&result) > target_tokens {
            return SlidingWindowStrategy.compress(&result, target_tokens, counter);
        }
        result
    }

    fn name(&self) -> &'static str {
        "summarize_middle"
    }
}

// ---- Dyn-erasure for heterogeneous ContextStrategy collections ------------

type CompactFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Message>, ContextError>> + Send + 'a>>;

/// Because [`ContextStrategy::compact`] returns `impl Future` (RPITIT), the
/// trait isn't dyn-compatible. `ErasedStrategy` boxes the future so a
/// [`BoxedStrategy`] can hold any `ContextStrategy` behind one concrete type.
trait ErasedStrategy: Send + Sync {
    fn erased_compact<'a>(&'a self, messages: Vec<Message>) -> CompactFuture<'a>;
    fn erased_should_compact(&self, messages: &[Message], token_count: usize) -> bool;
    fn erased_token_estimate(&self, messages: &[Message]) -> usize;
}

impl<S: ContextStrategy> ErasedStrategy for S {
    fn erased_compact<'a>(&'a self, messages: Vec<Message>) -> CompactFuture<'a> {
        Box::pin(self.compact(messages))
    }

    fn erased_should_compact(&self, messages: &[Message], token_count: usize) -> bool {
        self.should_compact(messages, token_count)
    }

    fn erased_token_estimate(&self, messages: &[Message]) -> usize {
        self.token_estimate(messages)
    }
}

/// A type-erased [`ContextStrategy`], for call sites that need to hold
/// several strategy implementations in one collection.
#[derive(Clone)]
pub struct BoxedStrategy(Arc<dyn ErasedStrategy>);

impl BoxedStrategy {
    /// Erase any `ContextStrategy` into a `BoxedStrategy`.
    #[must_use]
    pub fn new<S: ContextStrategy + 'static>(strategy: S) -> Self {
        Self(Arc::new(strategy))
    }
}

impl ContextStrategy for BoxedStrategy {
    fn should_compact(&self, messages: &[Message], token_count: usize) -> bool {
        self.0.erased_should_compact(messages, token_count)
    }

    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + WasmCompatSend {
        let inner = Arc::clone(&self.0);
        async move { inner.erased_compact(messages).await }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.0.erased_token_estimate(messages)
    }
}
