//! Map/reduce execution engine
//!
//! An invocation wires four pieces together:
//!
//! ```text
//! ┌──────────┐  jobs   ┌─────────────┐ results ┌────────────────┐      ┌──────────┐
//! │ JobQueue │────────▶│ pool worker │────────▶│ ReductionLoop  │─────▶│ then(..) │
//! │ (caller) │         │  × N, map   │         │ serial, fold   │      │ once     │
//! └──────────┘         └─────────────┘         └────────────────┘      └──────────┘
//!                             │                                               ▲
//!                             └──── completion tokens ──▶ Synchronizer ───────┘
//! ```
//!
//! ## What This Module Does:
//! - **Submission**: returns a bounded [`JobQueue`]; a full queue blocks the
//!   producer
//! - **Mapping**: each job is mapped once, on whichever worker is free
//! - **Reduction**: results are folded one at a time on a dedicated thread,
//!   so the reducer needs no locking
//! - **Completion**: waits for every worker, resolves the outcome (pool
//!   fault, then reducer fault, then cancellation, then the value), and calls
//!   the handler exactly once
//!
//! ## What This Module Does NOT Do:
//! - **Ordering**: results arrive in whatever order workers finish them;
//!   only an associative reducer gives a deterministic value
//! - **Retries**: a panicking mapper ends the invocation and poisons its pool
//!
//! # Example Usage
//!
//! ```rust
//! use foldpool::cancel::Context;
//! use foldpool::pool::WorkerPool;
//! use foldpool::{Opt, ParallelError, reduce_with};
//! use crossbeam::channel::bounded;
//!
//! // Reuse one pool of three workers, each with a scratch buffer.
//! let (pool, shutdown) = WorkerPool::builder(3).init(|_| String::new()).build()?;
//!
//! let (done, outcome) = bounded(1);
//! let jobs = pool.parallel(
//!     0_usize,
//!     |scratch: &mut String, word: &'static str| {
//!         scratch.clear();
//!         scratch.push_str(word);
//!         scratch.len()
//!     },
//!     reduce_with(|acc, len| acc + len),
//!     move |result| done.send(result).unwrap(),
//!     [Opt::context(Context::background())],
//! )?;
//!
//! for word in ["map", "and", "reduce"] {
//!     jobs.send(word).unwrap();
//! }
//! jobs.close();
//!
//! assert_eq!(outcome.recv().unwrap()?, 12);
//! shutdown.shutdown();
//! # Ok::<(), ParallelError>(())
//! ```

pub mod core;
mod complete;
mod options;
mod queue;
mod reduce;

pub use self::core::{REDUCE_THREAD_NAME, parallel};
pub use options::Opt;
pub use queue::JobQueue;

/// Serial fold step: `acc = reducer(acc, result)`
pub type Reducer<A, R> = Box<dyn FnMut(A, R) -> A + Send>;

/// Box a closure as a [`Reducer`], ready to pass to [`parallel()`]
pub fn reduce_with<A, R, F>(reducer: F) -> Option<Reducer<A, R>>
where
    F: FnMut(A, R) -> A + Send + 'static,
{
    Some(Box::new(reducer))
}

/// Mapper that passes each job through unchanged
pub fn identity<S, J>(_state: &mut S, job: J) -> J {
    job
}
