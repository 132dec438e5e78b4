//! Fire-and-forget task spawning on the current thread's executor.

use std::future::Future;

/// Spawn a `!Send` future on the local executor.
///
/// Native builds must be running inside a `tokio::task::LocalSet`.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    tokio::task::spawn_local(future);
}

/// Spawn a `!Send` future on the browser's microtask queue.
#[cfg(target_arch = "wasm32")]
pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}
