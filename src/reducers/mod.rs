//! Ready-made reducers with a blocking result handle
//!
//! Each helper bundles the four things an invocation needs from its caller:
//!
//! - `value()`: the seed
//! - `reducer()`: the fold step
//! - `then()`: the completion handler
//! - `get()`: blocks until the handler has fired and returns its outcome
//!
//! ```rust
//! use foldpool::reducers::{Associative, add};
//! use foldpool::{Opt, identity, parallel};
//!
//! let sum = Associative::new(0_i64, add);
//! let jobs = parallel(
//!     sum.value(),
//!     identity,
//!     sum.reducer::<i64>(),
//!     sum.then(),
//!     [Opt::<()>::queue(8)],
//! )?;
//! jobs.send_all([0, 1, 2, -1]).unwrap();
//!
//! assert_eq!(sum.get()?, 2);
//! # Ok::<(), foldpool::ParallelError>(())
//! ```

mod lists;
mod math;

pub use lists::StringList;
pub use math::{Associative, add, max, min, multiply};

use std::sync::{Arc, OnceLock};

use crate::cancel::Signal;
use crate::error::ParallelError;

/// Outcome cell filled by a completion handler
struct Outcome<T> {
    slot: OnceLock<Result<T, ParallelError>>,
    done: Signal,
}

#[derive(Clone)]
struct Latch<T> {
    outcome: Arc<Outcome<T>>,
}

impl<T> Latch<T>
where
    T: Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            outcome: Arc::new(Outcome {
                slot: OnceLock::new(),
                done: Signal::new(),
            }),
        }
    }

    /// Handler that stores the first outcome and wakes every waiter
    fn handler(&self) -> impl FnOnce(Result<T, ParallelError>) + Send + use<T> {
        let outcome = self.outcome.clone();
        move |result| {
            if outcome.slot.set(result).is_ok() {
                outcome.done.fire();
            }
        }
    }

    fn wait(&self) -> Result<T, ParallelError>
    where
        T: Clone,
    {
        loop {
            if let Some(result) = self.outcome.slot.get() {
                return result.clone();
            }
            // Disconnects once the handler has stored the outcome.
            let _ = self.outcome.done.receiver().recv();
        }
    }
}
