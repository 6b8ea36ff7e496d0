use crossbeam::channel::Receiver;
use std::sync::Arc;

use super::assignment::{Dispatch, Flow};

/// One pool thread: services assignments until the pool stops dispatching
/// or an assignment reports a trapped fault.
pub(super) struct Worker<S> {
    pub(super) index: usize,
    pub(super) state: S,
    pub(super) assignments: Receiver<Dispatch<S>>,
    pub(super) destroy: Option<Arc<dyn Fn(S) + Send + Sync>>,
}

impl<S> Worker<S> {
    pub(super) fn run(self) {
        let Worker {
            index,
            mut state,
            assignments,
            destroy,
        } = self;

        tracing::trace!("worker {} started", index);

        for assignment in assignments.iter() {
            if let Flow::Terminate = assignment.service(index, &mut state) {
                tracing::debug!("worker {} terminated after a trapped fault", index);
                break;
            }
        }

        // Once every worker is gone, undelivered assignments are dropped
        // with the channel instead of waiting forever.
        drop(assignments);

        if let Some(destroy) = destroy {
            destroy(state);
        }

        tracing::trace!("worker {} exited", index);
    }
}
