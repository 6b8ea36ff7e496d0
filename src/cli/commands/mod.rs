use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{ConfigOverrides, EngineConfig};
use crate::cli::output::Output;

pub mod coins;
pub mod config;
pub mod primes;

#[derive(Parser)]
#[command(
    name = "foldpool",
    version = env!("CARGO_PKG_VERSION"),
    about = "Concurrent map/reduce over a reusable worker pool",
    long_about = "foldpool maps jobs on a pool of worker threads and folds the results \
                  on a single reduction thread. The commands below are sample workloads."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Submission queue capacity (0 = pool size)
    #[arg(long, global = true)]
    pub queue: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Flip coins in parallel, one RNG per worker
    Coins(coins::CoinsArgs),
    /// Count primes below a limit, split into chunks
    Primes(primes::PrimesArgs),
    /// Print the effective engine configuration
    Config(config::ConfigArgs),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let overrides = ConfigOverrides {
            workers: self.workers,
            queue: self.queue,
        };
        let engine = EngineConfig::load(self.config.as_deref(), Some(overrides))?;
        let output = Output::new(self.verbose > 0, self.quiet);

        match self.command {
            Commands::Coins(args) => coins::execute(args, &engine, &output),
            Commands::Primes(args) => primes::execute(args, &engine, &output),
            Commands::Config(args) => config::execute(args, &engine, &output),
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new("warn"),
        1 => tracing_subscriber::EnvFilter::new("info"),
        2 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
