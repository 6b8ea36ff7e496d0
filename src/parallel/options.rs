use std::fmt;
use std::sync::Arc;

use crate::cancel::Context;
use crate::error::ParallelError;
use crate::pool::{PoolProvider, PoolShutdown, WorkerPool};

/// One invocation option. Later options override earlier ones of the same kind.
pub struct Opt<S> {
    kind: OptKind<S>,
}

enum OptKind<S> {
    Queue(usize),
    Context(Option<Context>),
    Pool(WorkerPool<S>),
    Provider(Arc<dyn PoolProvider<S>>),
}

impl<S> Opt<S> {
    /// Capacity of the submission queue. Must be at least 1.
    pub fn queue(size: usize) -> Self {
        Self {
            kind: OptKind::Queue(size),
        }
    }

    /// Cancellation context for the invocation. `None` is rejected.
    pub fn context(ctx: impl Into<Option<Context>>) -> Self {
        Self {
            kind: OptKind::Context(ctx.into()),
        }
    }

    /// Run on an externally managed pool instead of a fresh one
    pub fn pool(pool: &WorkerPool<S>) -> Self {
        Self {
            kind: OptKind::Pool(pool.clone()),
        }
    }

    /// Where the fresh pool comes from when no pool is given
    pub fn provider(provider: impl PoolProvider<S> + 'static) -> Self {
        Self {
            kind: OptKind::Provider(Arc::new(provider)),
        }
    }
}

impl<S> fmt::Debug for Opt<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OptKind::Queue(size) => f.debug_tuple("Queue").field(size).finish(),
            OptKind::Context(ctx) => f.debug_tuple("Context").field(ctx).finish(),
            OptKind::Pool(pool) => f.debug_tuple("Pool").field(pool).finish(),
            OptKind::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

/// Options after validation
pub(crate) struct Options<S> {
    pub(crate) queue: Option<usize>,
    pub(crate) context: Context,
    pool: Option<WorkerPool<S>>,
    provider: Option<Arc<dyn PoolProvider<S>>>,
}

/// The pool an invocation runs on. `shutdown` is set when the invocation
/// owns the pool and must stop it at the end.
pub(crate) struct Acquired<S> {
    pub(crate) pool: WorkerPool<S>,
    pub(crate) shutdown: Option<PoolShutdown<S>>,
}

impl<S> Options<S> {
    pub(crate) fn resolve(opts: impl IntoIterator<Item = Opt<S>>) -> Result<Self, ParallelError> {
        let mut options = Options {
            queue: None,
            context: Context::background(),
            pool: None,
            provider: None,
        };

        for opt in opts {
            match opt.kind {
                OptKind::Queue(0) => return Err(ParallelError::InvalidQueueSize(0)),
                OptKind::Queue(size) => options.queue = Some(size),
                OptKind::Context(None) => return Err(ParallelError::InvalidContext),
                OptKind::Context(Some(ctx)) => options.context = ctx,
                OptKind::Pool(pool) => options.pool = Some(pool),
                OptKind::Provider(provider) => options.provider = Some(provider),
            }
        }

        Ok(options)
    }

    /// Pick the pool: an explicit pool first, then the configured provider,
    /// then `fallback`.
    pub(crate) fn acquire<F>(&mut self, fallback: F) -> Result<Acquired<S>, ParallelError>
    where
        F: FnOnce() -> Result<Acquired<S>, ParallelError>,
    {
        if let Some(pool) = self.pool.take() {
            return Ok(Acquired {
                pool,
                shutdown: None,
            });
        }

        match self.provider.take() {
            Some(provider) => {
                let (pool, shutdown) = provider.provide()?;
                Ok(Acquired {
                    pool,
                    shutdown: Some(shutdown),
                })
            }
            None => fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_fallback() -> Result<Acquired<()>, ParallelError> {
        panic!("fallback should not be used");
    }

    #[test]
    fn test_defaults() {
        let options = Options::<()>::resolve(Vec::new()).unwrap();
        assert_eq!(options.queue, None);
        assert!(!options.context.is_cancelled());
    }

    #[test]
    fn test_invalid_queue_size() {
        let err = Options::<()>::resolve([Opt::queue(0)]).err();
        assert!(matches!(err, Some(ParallelError::InvalidQueueSize(0))));
    }

    #[test]
    fn test_invalid_context() {
        let err = Options::<()>::resolve([Opt::context(None)]).err();
        assert!(matches!(err, Some(ParallelError::InvalidContext)));
    }

    #[test]
    fn test_later_options_override() {
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();

        let options = Options::<()>::resolve([Opt::queue(3), Opt::queue(7), Opt::context(ctx)]).unwrap();
        assert_eq!(options.queue, Some(7));
        assert!(options.context.is_cancelled());
    }

    #[test]
    fn test_explicit_pool_is_not_owned() {
        let (pool, shutdown) = WorkerPool::new(2).unwrap();
        let mut options = Options::resolve([Opt::pool(&pool)]).unwrap();

        let acquired = options.acquire(no_fallback).unwrap();
        assert_eq!(acquired.pool.size(), 2);
        assert!(acquired.shutdown.is_none());
        shutdown.shutdown();
    }

    #[test]
    fn test_provider_pool_is_owned() {
        let mut options = Options::resolve([Opt::provider(|| WorkerPool::new(3))]).unwrap();

        let acquired = options.acquire(no_fallback).unwrap();
        assert_eq!(acquired.pool.size(), 3);
        assert!(acquired.shutdown.is_some());
    }

    #[test]
    fn test_fallback_when_nothing_given() {
        let mut options = Options::<()>::resolve(Vec::new()).unwrap();
        let acquired = options
            .acquire(|| {
                let (pool, shutdown) = WorkerPool::new(1)?;
                Ok(Acquired {
                    pool,
                    shutdown: Some(shutdown),
                })
            })
            .unwrap();
        assert_eq!(acquired.pool.size(), 1);
    }
}
