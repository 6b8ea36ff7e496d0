use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::parallel::Opt;
use crate::pool::{DEFAULT_THREAD_NAME, DefaultPoolProvider, PoolBuilder, WorkerPool};

/// Repository-level config file, looked up in the working directory
pub const CONFIG_FILE: &str = "foldpool.toml";

/// Prefix of the environment variables read into [`EngineConfig`]
pub const ENV_PREFIX: &str = "FOLDPOOL_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads per pool (0 = one per CPU)
    pub workers: usize,
    /// Submission queue capacity (0 = pool size)
    pub queue: usize,
    /// Thread-name prefix for pool workers
    pub thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue: 0,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

/// Command line values layered over every other source. `None` fields are
/// left out of the merge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<usize>,
}

impl EngineConfig {
    pub fn load<T: Serialize>(custom_config: Option<&str>, cli_overrides: Option<T>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let config: EngineConfig = Self::figment(custom_config, cli_overrides)
            .extract()
            .context("Failed to load foldpool configuration")?;

        tracing::debug!(
            "CONFIG LOAD: workers={} queue={} thread_name={}",
            config.workers,
            config.queue,
            config.thread_name
        );
        Ok(config)
    }

    /// The merge chain behind [`EngineConfig::load`]
    pub fn figment<T: Serialize>(custom_config: Option<&str>, cli_overrides: Option<T>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(CONFIG_FILE));

        if let Some(path) = custom_config {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        if let Some(cli) = cli_overrides {
            tracing::trace!("CONFIG LOAD: Applying CLI overrides");
            figment = figment.merge(Serialized::defaults(cli));
        }

        figment
    }

    /// Effective number of workers
    pub fn pool_size(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// Effective submission queue capacity
    pub fn queue_size(&self) -> usize {
        if self.queue == 0 {
            self.pool_size()
        } else {
            self.queue
        }
    }

    /// Provider of single-use pools sized and named by this config
    pub fn provider(&self) -> DefaultPoolProvider {
        DefaultPoolProvider::sized(self.workers).name(self.thread_name.clone())
    }

    /// Builder for a reusable pool sized and named by this config
    pub fn pool_builder(&self) -> PoolBuilder<()> {
        WorkerPool::builder(self.workers).name(self.thread_name.clone())
    }

    /// Invocation options matching this config
    pub fn options<S>(&self) -> Vec<Opt<S>>
    where
        S: Default + Send + 'static,
    {
        let mut options = vec![Opt::provider(self.provider())];
        if self.queue > 0 {
            options.push(Opt::queue(self.queue));
        }
        options
    }
}
