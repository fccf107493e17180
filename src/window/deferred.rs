//! Cancellable deferred callbacks
//!
//! Start delays and resize debounces are scheduled as tokio tasks. A
//! [`Deferred`] owns the task's abort handle: cancelling (or dropping) it
//! aborts the task before the callback runs.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::error;

#[derive(Debug, Default)]
pub struct Deferred {
    handle: Option<AbortHandle>,
}

impl Deferred {
    /// Run `callback` once `delay` has elapsed on the current runtime.
    ///
    /// Outside a runtime nothing is scheduled and the callback is dropped.
    pub fn schedule<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot schedule deferred callback: {}", e);
                return Self::idle();
            }
        };

        let task = runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            callback();
        });
        Self {
            handle: Some(task.abort_handle()),
        }
    }

    /// A handle with nothing scheduled
    pub fn idle() -> Self {
        Self::default()
    }

    /// Abort the pending callback, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Forget the task without aborting it.
    ///
    /// Used by a callback that clears its own slot while running.
    pub fn disarm(&mut self) {
        self.handle = None;
    }

    /// Whether a callback is scheduled and has not finished
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        self.cancel();
    }
}
