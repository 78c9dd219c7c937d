//! WASM compatibility shims.
//!
//! On native targets these are plain aliases for `Send`/`Sync`. On wasm32
//! the bounds are dropped since wasm32 builds are single-threaded.

use std::future::Future;
use std::pin::Pin;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;

    /// Equivalent to `Send` on native, unconditional on wasm32.
    pub trait WasmCompatSend: Send {}
    impl<T: Send> WasmCompatSend for T {}

    /// Equivalent to `Sync` on native, unconditional on wasm32.
    pub trait WasmCompatSync: Sync {}
    impl<T: Sync> WasmCompatSync for T {}

    /// A boxed future, `Send` on native and unbound on wasm32.
    pub type WasmBoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

#[cfg(target_arch = "wasm32")]
mod wasm_impl {
    use super::*;

    /// Equivalent to `Send` on native, unconditional on wasm32.
    pub trait WasmCompatSend {}
    impl<T> WasmCompatSend for T {}

    /// Equivalent to `Sync` on native, unconditional on wasm32.
    pub trait WasmCompatSync {}
    impl<T> WasmCompatSync for T {}

    /// A boxed future, `Send` on native and unbound on wasm32.
    pub type WasmBoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::*;

#[cfg(target_arch = "wasm32")]
pub use wasm_impl::*;
