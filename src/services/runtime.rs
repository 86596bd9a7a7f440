//! Tokio Runtime Bridge
//!
//! The loader spawns its fetch tasks on tokio. Callers already inside a tokio
//! runtime (tests, async binaries) use that runtime; plain threads such as a
//! UI event loop fall back to a lazily created process-global one.
//!
//! ## Pattern
//!
//! ```text
//! UI thread / async caller
//!       │
//!       ▼
//! spawn_named(name, async { ... })
//!       │
//!       ▼
//! current tokio handle, else global Runtime
//! ```

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Handle, Runtime};

use crate::error::{Error, Result};

/// Global tokio runtime instance
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or initialize the global tokio runtime
fn get_runtime() -> Result<&'static Runtime> {
    if let Some(runtime) = TOKIO_RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Runtime::new()?;
    Ok(TOKIO_RUNTIME.get_or_init(|| runtime))
}

/// Handle of the runtime the caller is in, or of the global runtime
pub fn runtime_handle() -> Result<Handle> {
    match Handle::try_current() {
        Ok(handle) => Ok(handle),
        Err(_) => Ok(get_runtime()?.handle().clone()),
    }
}

/// Spawn a detached task with a name (for debugging)
pub fn spawn_named<F>(name: &'static str, future: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::trace!("Spawning tokio task: {}", name);
    runtime_handle()?.spawn(async move {
        future.await;
        tracing::trace!("Tokio task completed: {}", name);
    });
    Ok(())
}

/// Block on a future synchronously (use sparingly, mainly for the binary entry point)
///
/// **Warning**: This blocks the current thread and must not be called from
/// inside a tokio runtime.
pub fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = T>,
{
    if Handle::try_current().is_ok() {
        return Err(Error::Invalid {
            message: "block_on called from inside a tokio runtime".to_string(),
        });
    }
    Ok(get_runtime()?.block_on(future))
}
