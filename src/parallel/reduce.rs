use crossbeam::channel::Receiver;
use std::sync::Arc;

use super::Reducer;
use crate::cancel::Signal;
use crate::error::TrappedPanic;
use crate::trap;

/// Serial fold over an invocation's result queue
pub(crate) struct ReductionLoop<A, R> {
    pub(crate) reducer: Option<Reducer<A, R>>,
    pub(crate) results: Receiver<R>,
    /// Fired when the reducer panics so workers stop mapping
    pub(crate) stop: Arc<Signal>,
}

impl<A, R> ReductionLoop<A, R> {
    /// Fold every result into `seed` until the result queue closes.
    ///
    /// Always consumes the queue to the end so no worker stays blocked on a
    /// full result queue.
    pub(crate) fn run(self, seed: A) -> Result<A, TrappedPanic> {
        let ReductionLoop {
            reducer,
            results,
            stop,
        } = self;

        let Some(mut reducer) = reducer else {
            let discarded = results.iter().count();
            tracing::trace!("no reducer: discarded {} results", discarded);
            return Ok(seed);
        };

        let mut acc = seed;
        for result in results.iter() {
            match trap::catch(|| reducer(acc, result)) {
                Ok(next) => acc = next,
                Err(panic) => {
                    tracing::warn!("reducer panicked: {}", panic);

                    stop.fire();
                    for _ in results.iter() {}
                    return Err(panic);
                }
            }
        }

        Ok(acc)
    }
}
