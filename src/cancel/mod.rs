//! Cooperative cancellation contexts
//!
//! A [`Context`] is a cheap, cloneable view of a cancellation state. Workers
//! never poll it; they block in `select!` on [`Context::done`] together with
//! their job queue, so a blocked worker wakes as soon as the context fires.
//!
//! ```rust
//! use foldpool::cancel::{Context, ContextError};
//!
//! let (ctx, handle) = Context::with_cancel();
//! assert!(!ctx.is_cancelled());
//!
//! handle.cancel();
//! assert_eq!(ctx.err(), Some(ContextError::Cancelled));
//! ```

mod signal;

pub(crate) use signal::Signal;

use crossbeam::channel::{Receiver, at, select};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ParallelError;

/// Why a context was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

struct Inner {
    signal: Signal,
    reason: OnceLock<ContextError>,
}

impl Inner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            signal: Signal::new(),
            reason: OnceLock::new(),
        })
    }

    fn cancel(&self, reason: ContextError) {
        // Reason first: anyone woken by the signal must see it.
        if self.reason.set(reason).is_ok() {
            self.signal.fire();
            tracing::trace!("context cancelled: {}", reason);
        }
    }
}

/// Cancellation state shared between the caller and the engine
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// A context that is never cancelled
    pub fn background() -> Self {
        Self { inner: Inner::new() }
    }

    /// A context cancelled by the returned handle
    pub fn with_cancel() -> (Self, CancelHandle) {
        let inner = Inner::new();
        (
            Self {
                inner: inner.clone(),
            },
            CancelHandle { inner },
        )
    }

    /// A context cancelled with [`ContextError::DeadlineExceeded`] once
    /// `timeout` has elapsed, or earlier through the handle.
    pub fn with_timeout(timeout: Duration) -> Result<(Self, CancelHandle), ParallelError> {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Like [`Context::with_timeout`] with an absolute deadline.
    ///
    /// A watcher thread waits for the deadline. It exits early if the context
    /// is cancelled first, or once every clone of the context and its handle
    /// has been dropped.
    pub fn with_deadline(deadline: Instant) -> Result<(Self, CancelHandle), ParallelError> {
        let (ctx, handle) = Self::with_cancel();

        // Weak, so the watcher never keeps an abandoned context alive.
        let inner = Arc::downgrade(&ctx.inner);
        let done = ctx.done().clone();
        thread::Builder::new()
            .name("foldpool-deadline".to_string())
            .spawn(move || {
                select! {
                    recv(done) -> _ => {}
                    recv(at(deadline)) -> _ => {
                        if let Some(inner) = inner.upgrade() {
                            inner.cancel(ContextError::DeadlineExceeded);
                        }
                    }
                }
            })
            .map_err(|e| ParallelError::spawn("foldpool-deadline", e))?;

        Ok((ctx, handle))
    }

    /// Receiver that disconnects when the context is cancelled
    pub fn done(&self) -> &Receiver<()> {
        self.inner.signal.receiver()
    }

    /// The cancellation reason, or `None` while the context is live
    pub fn err(&self) -> Option<ContextError> {
        self.inner.reason.get().copied()
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("err", &self.err()).finish()
    }
}

/// Cancels the [`Context`] it was created with
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    /// Cancel the context. Later calls have no effect.
    pub fn cancel(&self) {
        self.inner.cancel(ContextError::Cancelled);
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.inner.reason.get().is_some())
            .finish()
    }
}
