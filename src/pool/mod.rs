//! Reusable worker pool
//!
//! A [`WorkerPool`] owns N long-lived threads. Each thread carries private
//! state built once by the pool's `init` hook and handed to `destroy` once
//! when the thread exits. Between invocations the threads park on a dispatch
//! channel; every engine invocation sends one assignment per worker.
//!
//! ```text
//! ┌──────────────┐  assignments  ┌──────────┐  jobs   ┌──────────┐
//! │ parallel(..) │──────────────▶│ worker 0 │◀────────│ JobQueue │
//! │              │──────────────▶│ worker 1 │◀────────│ (caller) │
//! │              │──────────────▶│ worker N │◀────────│          │
//! └──────────────┘               └──────────┘         └──────────┘
//! ```
//!
//! A pool is poisoned by the first fault recorded in its failure trap: a
//! mapper panic, or [`PoolShutdown::shutdown`]. A poisoned pool refuses new
//! invocations.
//!
//! # Example
//!
//! ```rust
//! use foldpool::pool::WorkerPool;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let destroyed = Arc::new(AtomicUsize::new(0));
//! let counter = destroyed.clone();
//!
//! let (pool, shutdown) = WorkerPool::builder(2)
//!     .init(|index| index * 10)
//!     .destroy(move |_state: usize| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .build()?;
//!
//! assert_eq!(pool.size(), 2);
//! shutdown.shutdown();
//! assert_eq!(destroyed.load(Ordering::SeqCst), 2);
//! assert!(pool.is_poisoned());
//! # Ok::<(), foldpool::ParallelError>(())
//! ```

pub(crate) mod assignment;
mod provider;
mod worker;

pub use provider::{DefaultPoolProvider, PoolProvider};

use crossbeam::channel::{Sender, unbounded};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::ParallelError;
use crate::trap::{FailureTrap, Fault};
use assignment::Dispatch;
use worker::Worker;

/// Default thread-name prefix for pool workers
pub const DEFAULT_THREAD_NAME: &str = "foldpool-worker";

struct Shared<S> {
    size: usize,
    dispatch: Mutex<Option<Sender<Dispatch<S>>>>,
    trap: Arc<FailureTrap>,
}

/// Handle to a running pool. Cheap to clone; clones share the same threads.
pub struct WorkerPool<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for WorkerPool<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S> fmt::Debug for WorkerPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.shared.size)
            .field("poisoned", &self.is_poisoned())
            .finish()
    }
}

impl WorkerPool<()> {
    /// Start a stateless pool of `size` workers (`0` = one per CPU)
    pub fn new(size: usize) -> Result<(Self, PoolShutdown<()>), ParallelError> {
        Self::builder(size).build()
    }

    /// Configure a pool of `size` workers (`0` = one per CPU)
    pub fn builder(size: usize) -> PoolBuilder<()> {
        PoolBuilder {
            size,
            name: DEFAULT_THREAD_NAME.to_string(),
            init: Box::new(|_| ()),
            destroy: None,
        }
    }
}

impl<S> WorkerPool<S> {
    /// Number of worker threads the pool was started with
    pub fn size(&self) -> usize {
        self.shared.size
    }

    /// True once the pool has recorded a fault or has been shut down
    pub fn is_poisoned(&self) -> bool {
        self.shared.trap.is_set()
    }

    /// The fault that poisoned the pool, as the error an invocation reports
    pub fn fault(&self) -> Option<ParallelError> {
        self.shared.trap.get().cloned().map(ParallelError::from)
    }

    pub(crate) fn trap(&self) -> &Arc<FailureTrap> {
        &self.shared.trap
    }

    /// Hand one assignment to each worker.
    ///
    /// Returns false when the pool no longer accepts work; the assignments
    /// are dropped, which releases their completion tokens.
    pub(crate) fn dispatch(&self, assignments: Vec<Dispatch<S>>) -> bool {
        let sender = self
            .shared
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(sender) = sender else {
            return false;
        };

        assignments
            .into_iter()
            .all(|assignment| sender.send(assignment).is_ok())
    }
}

/// Builder for [`WorkerPool`]
pub struct PoolBuilder<S> {
    size: usize,
    name: String,
    init: Box<dyn Fn(usize) -> S>,
    destroy: Option<Arc<dyn Fn(S) + Send + Sync>>,
}

impl<S: Send + 'static> PoolBuilder<S> {
    /// Build each worker's private state from its index.
    ///
    /// Runs on the thread calling [`PoolBuilder::build`], once per worker,
    /// before that worker starts. Replaces any `destroy` hook set so far.
    pub fn init<T, F>(self, init: F) -> PoolBuilder<T>
    where
        F: Fn(usize) -> T + 'static,
    {
        PoolBuilder {
            size: self.size,
            name: self.name,
            init: Box::new(init),
            destroy: None,
        }
    }

    /// Release a worker's state when the worker exits
    pub fn destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(S) + Send + Sync + 'static,
    {
        self.destroy = Some(Arc::new(destroy));
        self
    }

    /// Thread-name prefix; workers are named `<prefix>-<index>`
    pub fn name(mut self, prefix: impl Into<String>) -> Self {
        self.name = prefix.into();
        self
    }

    /// Spawn the workers
    pub fn build(self) -> Result<(WorkerPool<S>, PoolShutdown<S>), ParallelError> {
        let size = if self.size < 1 {
            num_cpus::get()
        } else {
            self.size
        };

        let (dispatch, assignments) = unbounded();
        let shared = Arc::new(Shared {
            size,
            dispatch: Mutex::new(Some(dispatch)),
            trap: Arc::new(FailureTrap::new()),
        });

        let mut shutdown = PoolShutdown {
            shared: shared.clone(),
            workers: Vec::with_capacity(size),
        };

        for index in 0..size {
            let worker = Worker {
                index,
                state: (self.init)(index),
                assignments: assignments.clone(),
                destroy: self.destroy.clone(),
            };

            let name = format!("{}-{}", self.name, index);
            // On failure the already running workers are stopped when
            // `shutdown` drops.
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker.run())
                .map_err(|e| ParallelError::spawn(name, e))?;
            shutdown.workers.push(handle);
        }

        tracing::debug!("worker pool started: {} workers", size);

        Ok((WorkerPool { shared }, shutdown))
    }
}

/// Stops a pool. Returned once, alongside the first [`WorkerPool`] handle.
///
/// Dropping it has the same effect as calling [`PoolShutdown::shutdown`],
/// including the wait for running invocations: dropping it while a
/// [`JobQueue`](crate::JobQueue) of this pool is still open, on the thread
/// that owns that queue, never returns. Close or drop every job queue first.
///
/// ```rust
/// use foldpool::pool::WorkerPool;
/// use foldpool::reducers::{Associative, add};
/// use foldpool::identity;
///
/// let (pool, shutdown) = WorkerPool::new(2)?;
/// let sum = Associative::new(0_i64, add);
/// let jobs = pool.parallel(sum.value(), identity, sum.reducer::<i64>(), sum.then(), [])?;
/// jobs.send_all(1..=4).unwrap();
/// assert_eq!(sum.get()?, 10);
///
/// // Every job queue is closed, so this returns.
/// drop(shutdown);
/// # Ok::<(), foldpool::ParallelError>(())
/// ```
pub struct PoolShutdown<S> {
    shared: Arc<Shared<S>>,
    workers: Vec<JoinHandle<()>>,
}

impl<S> PoolShutdown<S> {
    /// Poison the pool, stop dispatching, and join every worker.
    ///
    /// Assignments already dispatched are serviced first, so this blocks
    /// until their producers close their job queues. Every `destroy` hook
    /// has run when this returns.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        self.shared.trap.record(Fault::ShutDown);
        self.shared
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            // A worker cannot join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked outside of a mapper");
            }
        }

        tracing::debug!("worker pool shut down");
    }
}

impl<S> Drop for PoolShutdown<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S> fmt::Debug for PoolShutdown<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolShutdown")
            .field("workers", &self.workers.len())
            .finish()
    }
}
