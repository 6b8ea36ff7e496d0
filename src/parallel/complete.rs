use crossbeam::sync::WaitGroup;
use std::sync::Arc;

use crate::cancel::Context;
use crate::error::{ParallelError, TrappedPanic};
use crate::pool::PoolShutdown;
use crate::trap::FailureTrap;

/// Waits out an invocation and reports its single outcome
pub(crate) struct Synchronizer<S, F> {
    /// Released by every worker copy of the assignment
    pub(crate) pending: WaitGroup,
    pub(crate) trap: Arc<FailureTrap>,
    pub(crate) context: Context,
    pub(crate) then: F,
    /// Set when the invocation owns its pool
    pub(crate) owned: Option<PoolShutdown<S>>,
}

impl<S, F> Synchronizer<S, F> {
    /// Wait for the workers, resolve the outcome, and call the handler once
    pub(crate) fn finish<A>(self, reduced: Result<A, TrappedPanic>)
    where
        F: FnOnce(Result<A, ParallelError>),
    {
        let Synchronizer {
            pending,
            trap,
            context,
            then,
            owned,
        } = self;

        pending.wait();

        let outcome = resolve(&trap, reduced, &context);
        match &outcome {
            Ok(_) => tracing::debug!("invocation completed"),
            Err(e) => tracing::debug!("invocation failed: {}", e),
        }

        // `owned` is dropped while unwinding if the handler panics.
        then(outcome);

        if let Some(shutdown) = owned {
            shutdown.shutdown();
        }
    }
}

/// Pool fault, then invocation fault, then cancellation, then the value
fn resolve<A>(
    trap: &FailureTrap,
    reduced: Result<A, TrappedPanic>,
    context: &Context,
) -> Result<A, ParallelError> {
    if let Some(fault) = trap.get() {
        return Err(fault.clone().into());
    }

    let value = reduced?;

    if let Some(reason) = context.err() {
        return Err(reason.into());
    }

    Ok(value)
}
