//! Error types surfaced by the engine
//!
//! Every error reaches the caller as a [`ParallelError`], either returned from
//! [`crate::parallel()`] or handed to the completion handler. Panics raised by
//! caller code (mappers and reducers) never cross a thread boundary; they are
//! caught and turned into a [`TrappedPanic`] value first.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cancel::ContextError;

/// Errors produced by the engine and the worker pool
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParallelError {
    /// `Opt::queue` was given a capacity below 1
    #[error("invalid option value: queue size must be at least 1, got {0}")]
    InvalidQueueSize(usize),

    /// `Opt::context` was given no context
    #[error("invalid option value: context")]
    InvalidContext,

    /// The worker pool was shut down before or while it was servicing work
    #[error("worker pool was already shut down")]
    PoolShutDown,

    /// A mapper or reducer panicked
    #[error(transparent)]
    Trapped(#[from] TrappedPanic),

    /// The cancellation context fired before the invocation completed
    #[error(transparent)]
    Cancelled(#[from] ContextError),

    /// The OS refused to spawn a thread
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: Arc<io::Error>,
    },
}

impl ParallelError {
    pub(crate) fn spawn(name: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source: Arc::new(source),
        }
    }

    /// The trapped panic, if this error carries one
    pub fn trapped(&self) -> Option<&TrappedPanic> {
        match self {
            Self::Trapped(panic) => Some(panic),
            _ => None,
        }
    }

    /// True when the error came from the cancellation context
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// A panic captured at the boundary where caller code runs.
///
/// Keeps the original panic payload, a message view of it, and the backtrace
/// of the panic site. The error message is the panic message alone; the
/// backtrace is available through [`TrappedPanic::backtrace`].
#[derive(Clone, thiserror::Error)]
#[error("{message}")]
pub struct TrappedPanic {
    message: String,
    original: Arc<Mutex<Box<dyn Any + Send>>>,
    backtrace: Arc<Backtrace>,
}

impl TrappedPanic {
    /// Build from the payload returned by `std::panic::catch_unwind`.
    ///
    /// The backtrace is taken here, after unwinding; panics trapped by the
    /// engine carry the backtrace of the panic site instead.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        Self::with_backtrace(payload, Backtrace::force_capture())
    }

    pub(crate) fn with_backtrace(payload: Box<dyn Any + Send>, backtrace: Backtrace) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            message,
            original: Arc::new(Mutex::new(payload)),
            backtrace: Arc::new(backtrace),
        }
    }

    /// The panic message
    pub fn payload(&self) -> &str {
        &self.message
    }

    /// True when the original payload is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.original().is::<T>()
    }

    /// A copy of the original payload, if it is a `T`
    pub fn downcast<T: Any + Clone>(&self) -> Option<T> {
        self.original().downcast_ref::<T>().cloned()
    }

    /// The original payload, ready for `std::panic::resume_unwind`.
    ///
    /// Fails, handing `self` back, while other clones still share it.
    pub fn into_payload(self) -> Result<Box<dyn Any + Send>, Self> {
        let TrappedPanic {
            message,
            original,
            backtrace,
        } = self;

        Arc::try_unwrap(original)
            .map(|payload| payload.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(|original| TrappedPanic {
                message,
                original,
                backtrace,
            })
    }

    /// Backtrace of the panic
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    fn original(&self) -> MutexGuard<'_, Box<dyn Any + Send>> {
        self.original.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TrappedPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrappedPanic")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
