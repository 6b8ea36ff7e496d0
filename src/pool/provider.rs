use super::{DEFAULT_THREAD_NAME, PoolShutdown, WorkerPool};
use crate::error::ParallelError;

/// Supplies the single-use pool an invocation runs on when no pool is given.
///
/// The invocation owns what `provide` returns and shuts it down once the
/// completion handler has run. Closures returning a fresh pool implement
/// this trait, so tests can substitute a deterministic pool:
///
/// ```rust
/// use foldpool::pool::{PoolProvider, WorkerPool};
///
/// let single = || WorkerPool::new(1);
/// let (pool, shutdown) = single.provide()?;
/// assert_eq!(pool.size(), 1);
/// shutdown.shutdown();
/// # Ok::<(), foldpool::ParallelError>(())
/// ```
pub trait PoolProvider<S>: Send + Sync {
    fn provide(&self) -> Result<(WorkerPool<S>, PoolShutdown<S>), ParallelError>;
}

impl<S, F> PoolProvider<S> for F
where
    F: Fn() -> Result<(WorkerPool<S>, PoolShutdown<S>), ParallelError> + Send + Sync,
{
    fn provide(&self) -> Result<(WorkerPool<S>, PoolShutdown<S>), ParallelError> {
        self()
    }
}

/// Builds a fresh pool whose worker states are `S::default()`
#[derive(Debug, Clone)]
pub struct DefaultPoolProvider {
    size: usize,
    name: String,
}

impl DefaultPoolProvider {
    /// One worker per CPU
    pub fn cores() -> Self {
        Self::sized(0)
    }

    /// `size` workers (`0` = one per CPU)
    pub fn sized(size: usize) -> Self {
        Self {
            size,
            name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Thread-name prefix for the pools this provider builds
    pub fn name(mut self, prefix: impl Into<String>) -> Self {
        self.name = prefix.into();
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for DefaultPoolProvider {
    fn default() -> Self {
        Self::cores()
    }
}

impl<S> PoolProvider<S> for DefaultPoolProvider
where
    S: Default + Send + 'static,
{
    fn provide(&self) -> Result<(WorkerPool<S>, PoolShutdown<S>), ParallelError> {
        WorkerPool::builder(self.size)
            .name(self.name.clone())
            .init(|_| S::default())
            .build()
    }
}
