//! The provider-adapter streaming boundary.
//!
//! `generate_content_stream` (§4.1) yields a lazy sequence of partial
//! [`ProviderResponse`] chunks; each chunk's `candidates[0].content.parts`
//! carries whatever the provider emitted since the last chunk (a `Text`
//! delta, a complete `FunctionCall`, or both). The Turn Engine is the
//! consumer that folds these into turn-level events.

use std::fmt;
use std::pin::Pin;

use futures::Stream;

use crate::error::ProviderError;
use crate::types::ProviderResponse;
use crate::wasm::WasmCompatSend;

/// One item of a provider's streaming response.
pub type StreamItem = Result<ProviderResponse, ProviderError>;

/// A boxed stream of response chunks.
pub type ProviderStream<'a> = Pin<Box<dyn Stream<Item = StreamItem> + WasmCompatSend + 'a>>;

/// Handle to an in-flight streaming completion.
pub struct StreamHandle {
    /// The chunk stream. Consume with `StreamExt::next()`.
    pub chunks: ProviderStream<'static>,
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

impl StreamHandle {
    /// Wrap an existing chunk stream.
    #[must_use]
    pub fn new(chunks: ProviderStream<'static>) -> Self {
        Self { chunks }
    }
}
