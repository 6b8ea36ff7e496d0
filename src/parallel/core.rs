use crossbeam::channel::{SendError, bounded};
use crossbeam::sync::WaitGroup;
use std::io;
use std::sync::Arc;
use std::thread;

use super::complete::Synchronizer;
use super::options::{Acquired, Opt, Options};
use super::queue::JobQueue;
use super::reduce::ReductionLoop;
use super::Reducer;
use crate::cancel::Signal;
use crate::error::ParallelError;
use crate::pool::assignment::{Dispatch, MapAssignment, SharedMapper};
use crate::pool::{DefaultPoolProvider, PoolProvider, WorkerPool};

/// Name of the thread running an invocation's reduction loop
pub const REDUCE_THREAD_NAME: &str = "foldpool-reduce";

/// Start a map/reduce invocation and return its submission queue.
///
/// Every job sent to the queue is passed to `mapper` on one pool worker,
/// together with that worker's private state. Results are folded into
/// `seed` by `reducer` on a single thread, in arrival order. Once the queue
/// is closed and drained, `then` receives the final accumulator or the
/// first error, exactly once.
///
/// Without [`Opt::pool`] the invocation runs on a fresh pool from the
/// configured [`PoolProvider`] (one worker per CPU by default) and shuts it
/// down after `then` returns.
///
/// Invalid options are reported to `then` before this returns, and returned.
///
/// # Panics
///
/// Panics if the chosen pool has been poisoned by an earlier fault.
///
/// # Example
///
/// ```rust
/// use foldpool::{Opt, identity, parallel, reduce_with};
/// use crossbeam::channel::bounded;
///
/// let (done, result) = bounded(1);
/// let jobs = parallel(
///     0_i64,
///     identity,
///     reduce_with(|acc, n: i64| acc + n),
///     move |outcome| done.send(outcome).unwrap(),
///     [Opt::<()>::queue(4)],
/// )?;
/// jobs.send_all([0, 1, 2, -1]).unwrap();
///
/// assert_eq!(result.recv().unwrap()?, 2);
/// # Ok::<(), foldpool::ParallelError>(())
/// ```
pub fn parallel<A, J, R, S, M, F>(
    seed: A,
    mapper: M,
    reducer: Option<Reducer<A, R>>,
    then: F,
    opts: impl IntoIterator<Item = Opt<S>>,
) -> Result<JobQueue<J>, ParallelError>
where
    A: Send + 'static,
    J: Send + 'static,
    R: Send + 'static,
    S: Default + Send + 'static,
    M: Fn(&mut S, J) -> R + Send + Sync + 'static,
    F: FnOnce(Result<A, ParallelError>) + Send + 'static,
{
    start(seed, mapper, reducer, then, Options::resolve(opts), || {
        let (pool, shutdown) = DefaultPoolProvider::cores().provide()?;
        Ok(Acquired {
            pool,
            shutdown: Some(shutdown),
        })
    })
}

impl<S: Send + 'static> WorkerPool<S> {
    /// Start an invocation on this pool.
    ///
    /// Same as [`parallel()`] with this pool as the default; an [`Opt::pool`]
    /// or [`Opt::provider`] in `opts` still takes precedence.
    pub fn parallel<A, J, R, M, F>(
        &self,
        seed: A,
        mapper: M,
        reducer: Option<Reducer<A, R>>,
        then: F,
        opts: impl IntoIterator<Item = Opt<S>>,
    ) -> Result<JobQueue<J>, ParallelError>
    where
        A: Send + 'static,
        J: Send + 'static,
        R: Send + 'static,
        M: Fn(&mut S, J) -> R + Send + Sync + 'static,
        F: FnOnce(Result<A, ParallelError>) + Send + 'static,
    {
        start(seed, mapper, reducer, then, Options::resolve(opts), || {
            Ok(Acquired {
                pool: self.clone(),
                shutdown: None,
            })
        })
    }
}

/// Everything the reduction thread needs, handed over after it started
struct Invocation<A, R, S, F> {
    seed: A,
    reduction: ReductionLoop<A, R>,
    synchronizer: Synchronizer<S, F>,
}

impl<A, R, S, F> Invocation<A, R, S, F>
where
    F: FnOnce(Result<A, ParallelError>),
{
    fn run(self) {
        let Invocation {
            seed,
            reduction,
            synchronizer,
        } = self;

        let reduced = reduction.run(seed);
        synchronizer.finish(reduced);
    }
}

fn start<A, J, R, S, M, F, P>(
    seed: A,
    mapper: M,
    reducer: Option<Reducer<A, R>>,
    then: F,
    options: Result<Options<S>, ParallelError>,
    fallback: P,
) -> Result<JobQueue<J>, ParallelError>
where
    A: Send + 'static,
    J: Send + 'static,
    R: Send + 'static,
    S: Send + 'static,
    M: Fn(&mut S, J) -> R + Send + Sync + 'static,
    F: FnOnce(Result<A, ParallelError>) + Send + 'static,
    P: FnOnce() -> Result<Acquired<S>, ParallelError>,
{
    let acquired = options.and_then(|mut options| {
        let acquired = options.acquire(fallback)?;
        Ok((options, acquired))
    });
    let (options, Acquired { pool, shutdown }) = match acquired {
        Ok(acquired) => acquired,
        Err(e) => {
            tracing::debug!("invocation rejected: {}", e);
            then(Err(e.clone()));
            return Err(e);
        }
    };

    if let Some(fault) = pool.fault() {
        panic!("worker pool is poisoned: {fault}");
    }

    // The reduction thread waits for its work so a spawn failure still
    // reaches the handler.
    let (handoff, pickup) = bounded::<Invocation<A, R, S, F>>(1);
    let spawned = thread::Builder::new()
        .name(REDUCE_THREAD_NAME.to_string())
        .spawn(move || {
            if let Ok(invocation) = pickup.recv() {
                invocation.run();
            }
        });
    if let Err(e) = spawned {
        let err = ParallelError::spawn(REDUCE_THREAD_NAME, e);
        then(Err(err.clone()));
        return Err(err);
    }

    let size = pool.size();
    let capacity = options.queue.unwrap_or(size);
    let (job_tx, job_rx) = bounded(capacity);
    let (result_tx, result_rx) = bounded(size);
    let stop = Arc::new(Signal::new());
    let pending = WaitGroup::new();
    let mapper: SharedMapper<S, J, R> = Arc::new(mapper);

    let assignments: Vec<Dispatch<S>> = (0..size)
        .map(|_| {
            Box::new(MapAssignment {
                jobs: job_rx.clone(),
                results: result_tx.clone(),
                mapper: mapper.clone(),
                cancelled: options.context.done().clone(),
                stopped: stop.receiver().clone(),
                pending: pending.clone(),
                trap: pool.trap().clone(),
            }) as Dispatch<S>
        })
        .collect();
    // Only the assignments hold these ends from here on.
    drop(job_rx);
    drop(result_tx);

    tracing::debug!(
        "invocation started: {} workers, queue capacity {}",
        size,
        capacity
    );

    if !pool.dispatch(assignments) {
        tracing::debug!("pool stopped accepting work before dispatch");
    }

    let invocation = Invocation {
        seed,
        reduction: ReductionLoop {
            reducer,
            results: result_rx,
            stop,
        },
        synchronizer: Synchronizer {
            pending,
            trap: pool.trap().clone(),
            context: options.context,
            then,
            owned: shutdown,
        },
    };

    if let Err(SendError(invocation)) = handoff.send(invocation) {
        let err = ParallelError::spawn(
            REDUCE_THREAD_NAME,
            io::Error::other("reduction thread exited before it started"),
        );
        let Invocation { synchronizer, .. } = invocation;
        (synchronizer.then)(Err(err.clone()));
        return Err(err);
    }

    Ok(JobQueue::new(job_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{identity, reduce_with};
    use crate::pool::PoolShutdown;
    use crossbeam::channel::Receiver;
    use std::time::Duration;

    fn collect<A: Send + 'static>() -> (
        impl FnOnce(Result<A, ParallelError>) + Send + 'static,
        Receiver<Result<A, ParallelError>>,
    ) {
        let (tx, rx) = bounded(1);
        (
            move |outcome: Result<A, ParallelError>| {
                let _ = tx.send(outcome);
            },
            rx,
        )
    }

    #[test]
    fn test_sum_on_fresh_pool() {
        let (then, outcome) = collect::<i64>();
        let jobs = parallel(
            0_i64,
            identity,
            reduce_with(|acc, n: i64| acc + n),
            then,
            [Opt::<()>::provider(|| WorkerPool::new(3))],
        )
        .unwrap();
        jobs.send_all(1..=100).unwrap();

        let total = outcome.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(total.unwrap(), 5050);
    }

    #[test]
    fn test_queue_capacity_defaults_to_pool_size() {
        let (pool, shutdown) = WorkerPool::new(3).unwrap();
        let (then, outcome) = collect::<i64>();

        let jobs = pool
            .parallel(0_i64, identity, reduce_with(|acc, n: i64| acc + n), then, [])
            .unwrap();
        assert_eq!(jobs.capacity(), 3);
        jobs.close();

        assert_eq!(outcome.recv().unwrap().unwrap(), 0);
        shutdown.shutdown();
    }

    #[test]
    fn test_config_error_reaches_handler_and_caller() {
        let (then, outcome) = collect::<i64>();
        let err = parallel(
            0_i64,
            identity,
            reduce_with(|acc, n: i64| acc + n),
            then,
            [Opt::<()>::queue(0)],
        )
        .unwrap_err();

        assert!(matches!(err, ParallelError::InvalidQueueSize(0)));
        assert!(matches!(
            outcome.try_recv().unwrap(),
            Err(ParallelError::InvalidQueueSize(0))
        ));
    }

    #[test]
    fn test_provider_error_reaches_handler() {
        let (then, outcome) = collect::<i64>();
        let failing = || -> Result<(WorkerPool<()>, PoolShutdown<()>), ParallelError> {
            Err(ParallelError::PoolShutDown)
        };
        let result = parallel(
            0_i64,
            identity,
            reduce_with(|acc, n: i64| acc + n),
            then,
            [Opt::<()>::provider(failing)],
        );

        assert!(matches!(result, Err(ParallelError::PoolShutDown)));
        assert!(outcome.try_recv().unwrap().is_err());
    }
}
