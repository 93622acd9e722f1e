//! Sync/async bridge.
//!
//! Blocking entry points (`query`, `save`, the CLI) drive async backend
//! code on one lazily-created, process-wide multi-thread runtime. Calling
//! [`block_on`] from inside any tokio runtime would deadlock or panic, so
//! it is refused with [`KbError::Runtime`] instead.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{KbError, Result};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The shared runtime, built on first use.
///
/// # Panics
///
/// Panics if the OS refuses to create the runtime's worker threads.
pub fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("kb-runtime")
            .build()
            .unwrap_or_else(|e| panic!("failed to build tokio runtime: {e}"))
    })
}

/// Run `future` to completion on the shared runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(KbError::Runtime(
            "blocking call made from inside an async runtime; use the async variant instead"
                .to_string(),
        ));
    }
    Ok(runtime().block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_runs_future() {
        let value = block_on(async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
        // Same runtime on every call.
        assert!(std::ptr::eq(runtime(), runtime()));
    }

    #[tokio::test]
    async fn test_block_on_refuses_nested_runtime() {
        let err = block_on(async { 1 }).unwrap_err();
        assert!(matches!(err, KbError::Runtime(_)));
        assert!(!err.is_retryable());
    }
}
