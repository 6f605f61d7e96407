//! One-shot result cells shared between the settling thread and waiters.
//!
//! A promise settles at most once. Later `resolve` or `reject` calls return
//! `false` and leave the first outcome in place, so racing finalizers
//! degrade to no-ops.

use crate::error::{RenameError, Result};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Why a promise was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The shared cancellation signal fired.
    Canceled,
    /// A refinement replaced the option generation this promise belonged to.
    Superseded,
}

impl From<Rejection> for RenameError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Canceled => RenameError::Canceled,
            Rejection::Superseded => RenameError::Superseded,
        }
    }
}

#[derive(Debug)]
enum PromiseState<T> {
    Pending,
    Resolved(T),
    Rejected(Rejection),
}

#[derive(Debug)]
struct PromiseInner<T> {
    state: Mutex<PromiseState<T>>,
    settled: Condvar,
}

/// A cloneable handle to a value that is produced exactly once.
#[derive(Debug)]
pub struct Promise<T> {
    inner: Arc<PromiseInner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Promise<T> {
    /// Create a pending promise.
    pub fn new() -> Self {
        Self::with_state(PromiseState::Pending)
    }

    /// Create a promise that is already resolved.
    pub fn resolved(value: T) -> Self {
        Self::with_state(PromiseState::Resolved(value))
    }

    /// Create a promise that is already rejected.
    pub fn rejected(rejection: Rejection) -> Self {
        Self::with_state(PromiseState::Rejected(rejection))
    }

    fn with_state(state: PromiseState<T>) -> Self {
        Self {
            inner: Arc::new(PromiseInner {
                state: Mutex::new(state),
                settled: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PromiseState<T>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve with `value`. Returns `false` if already settled.
    pub(crate) fn resolve(&self, value: T) -> bool {
        self.settle(PromiseState::Resolved(value))
    }

    /// Reject with `rejection`. Returns `false` if already settled.
    pub(crate) fn reject(&self, rejection: Rejection) -> bool {
        self.settle(PromiseState::Rejected(rejection))
    }

    fn settle(&self, outcome: PromiseState<T>) -> bool {
        let mut state = self.lock();
        if !matches!(*state, PromiseState::Pending) {
            return false;
        }
        *state = outcome;
        self.inner.settled.notify_all();
        true
    }

    /// Whether the promise has been resolved or rejected.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.lock(), PromiseState::Pending)
    }

    /// The outcome, if settled, without blocking.
    pub fn try_get(&self) -> Option<Result<T>> {
        Self::outcome(&self.lock())
    }

    /// Block until settled.
    pub fn wait(&self) -> Result<T> {
        let mut state = self.lock();
        loop {
            if let Some(outcome) = Self::outcome(&state) {
                return outcome;
            }
            state = self
                .inner
                .settled
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until settled or until `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(outcome) = Self::outcome(&state) {
                return Some(outcome);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            state = self
                .inner
                .settled
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn outcome(state: &PromiseState<T>) -> Option<Result<T>> {
        match state {
            PromiseState::Pending => None,
            PromiseState::Resolved(value) => Some(Ok(value.clone())),
            PromiseState::Rejected(rejection) => Some(Err((*rejection).into())),
        }
    }
}
