//! Shared cancellation signal.
//!
//! One token is threaded through every reference search, every follow-up
//! task and every promise of a rename search. Cancelling runs the
//! registered callbacks exactly once, on the cancelling thread.

use crate::error::{RenameError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

/// Cloneable cancellation signal.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Subsequent calls are no-ops.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        // Run outside the lock so callbacks may register or drop registrations.
        let callbacks = std::mem::take(
            &mut *self
                .inner
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        log::debug!("Cancellation requested, notifying {} listeners", callbacks.len());
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Canceled)` once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RenameError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Run `callback` on cancellation, or immediately if already cancelled.
    ///
    /// Dropping the returned registration unregisters the callback.
    pub fn on_cancel<F>(&self, callback: F) -> CancellationRegistration
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut callbacks = self
                .inner
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.is_cancelled() {
                callbacks.push((id, Box::new(callback)));
                return CancellationRegistration {
                    token: Arc::downgrade(&self.inner),
                    id,
                };
            }
        }

        callback();
        CancellationRegistration {
            token: Weak::new(),
            id,
        }
    }
}

/// Handle for a callback registered with [`CancellationToken::on_cancel`].
#[derive(Debug)]
pub struct CancellationRegistration {
    token: Weak<TokenInner>,
    id: u64,
}

impl Drop for CancellationRegistration {
    fn drop(&mut self) {
        if let Some(inner) = self.token.upgrade() {
            inner
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}
