//! # foldpool - concurrent map/reduce over a reusable worker pool
//!
//! Jobs are submitted through a bounded queue, mapped in parallel by a pool of
//! long-lived worker threads, and folded one at a time into an accumulator on
//! a single reduction thread. The completion handler receives the final value
//! or the first error, exactly once.
//!
//! ## Features
//!
//! - **Reusable pools**: per-worker state built once by `init`, released once
//!   by `destroy`, shared by any number of invocations
//! - **Lock-free reduction**: the reducer runs on one thread only
//! - **Backpressure**: producers block while the submission queue is full
//! - **Cancellation**: [`cancel::Context`] with manual cancel and deadlines
//! - **Panic isolation**: mapper and reducer panics come back as
//!   [`ParallelError::Trapped`] instead of tearing down the process
//!
//! ## Quick Start
//!
//! ```rust
//! use foldpool::reducers::{Associative, max};
//! use foldpool::{Opt, identity, parallel};
//!
//! let largest = Associative::new(i64::MIN, max);
//! let jobs = parallel(
//!     largest.value(),
//!     identity,
//!     largest.reducer::<i64>(),
//!     largest.then(),
//!     Vec::<Opt<()>>::new(),
//! )?;
//! jobs.send_all([3, -7, 12, 5]).unwrap();
//!
//! assert_eq!(largest.get()?, 12);
//! # Ok::<(), foldpool::ParallelError>(())
//! ```

pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod parallel;
pub mod pool;
pub mod reducers;
mod trap;

pub use cancel::{CancelHandle, Context, ContextError};
pub use config::EngineConfig;
pub use error::{ParallelError, TrappedPanic};
pub use parallel::{JobQueue, Opt, Reducer, identity, parallel, reduce_with};
pub use pool::{PoolShutdown, WorkerPool};

/// Result type alias for engine operations
pub type Result<T, E = ParallelError> = std::result::Result<T, E>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
