//! The per-invocation work handed to every pool worker

use crossbeam::channel::{Receiver, Sender, select};
use crossbeam::sync::WaitGroup;
use std::sync::Arc;

use crate::trap::{self, FailureTrap, Fault};

/// What a worker does after servicing an assignment
pub(crate) enum Flow {
    /// Wait for the next assignment
    Continue,
    /// Caller code panicked on this thread; the worker exits
    Terminate,
}

pub(crate) trait Assignment<S>: Send {
    fn service(self: Box<Self>, worker: usize, state: &mut S) -> Flow;
}

pub(crate) type Dispatch<S> = Box<dyn Assignment<S>>;

pub(crate) type SharedMapper<S, J, R> = Arc<dyn Fn(&mut S, J) -> R + Send + Sync>;

/// One worker's copy of an invocation's wiring
pub(crate) struct MapAssignment<S, J, R> {
    pub(crate) jobs: Receiver<J>,
    pub(crate) results: Sender<R>,
    pub(crate) mapper: SharedMapper<S, J, R>,
    /// Disconnects when the invocation's context is cancelled
    pub(crate) cancelled: Receiver<()>,
    /// Disconnects when the reduction loop gives up
    pub(crate) stopped: Receiver<()>,
    /// Completion token; released when this copy finishes
    pub(crate) pending: WaitGroup,
    pub(crate) trap: Arc<FailureTrap>,
}

impl<S, J, R> Assignment<S> for MapAssignment<S, J, R>
where
    J: Send,
    R: Send,
{
    fn service(self: Box<Self>, worker: usize, state: &mut S) -> Flow {
        let MapAssignment {
            jobs,
            results,
            mapper,
            cancelled,
            stopped,
            pending,
            trap,
        } = *self;

        loop {
            select! {
                recv(jobs) -> job => {
                    let Ok(job) = job else {
                        break;
                    };

                    match trap::catch(|| mapper(&mut *state, job)) {
                        Ok(result) => {
                            if results.send(result).is_err() {
                                drain(&jobs);
                                break;
                            }
                        }
                        Err(panic) => {
                            tracing::warn!("mapper panicked on worker {}: {}", worker, panic);
                            trap.record(Fault::Panicked(panic));

                            drop(pending);
                            drop(results);
                            drain(&jobs);
                            return Flow::Terminate;
                        }
                    }
                }
                recv(stopped) -> _ => {
                    tracing::trace!("worker {} stopped by the reduction loop", worker);
                    drain(&jobs);
                    break;
                }
                recv(cancelled) -> _ => {
                    tracing::trace!("worker {} observed cancellation", worker);
                    drain(&jobs);
                    break;
                }
            }
        }

        drop(pending);
        Flow::Continue
    }
}

/// Discard queued jobs until the producer closes the queue
fn drain<J>(jobs: &Receiver<J>) {
    for _ in jobs.iter() {}
}
