use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

use crate::cli::output::Output;
use crate::config::EngineConfig;
use crate::parallel::{Opt, reduce_with};
use crate::reducers::Associative;

#[derive(Args, Debug)]
pub struct CoinsArgs {
    /// Total number of coin flips
    #[arg(short, long, default_value_t = 1_000_000)]
    pub runs: u64,

    /// Flips per job
    #[arg(short, long, default_value_t = 10_000)]
    pub batch: u64,

    /// Base RNG seed; worker `i` uses `seed + i` (random when omitted)
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Split `runs` into jobs of at most `batch` flips
pub fn batches(runs: u64, batch: u64) -> impl Iterator<Item = u64> {
    let batch = batch.max(1);
    let full = runs / batch;
    let rest = runs % batch;
    (0..full).map(move |_| batch).chain((rest > 0).then_some(rest))
}

/// Heads among `flips` fair coin flips
pub fn flip(rng: &mut StdRng, flips: u64) -> u64 {
    (0..flips).filter(|_| rng.random_bool(0.5)).count() as u64
}

pub fn execute(args: CoinsArgs, engine: &EngineConfig, output: &Output) -> Result<()> {
    let base = args.seed.unwrap_or_else(|| rand::rng().random());
    output.verbose(&format!("base seed {base}"));

    let (pool, shutdown) = engine
        .pool_builder()
        .init(move |index| StdRng::seed_from_u64(base.wrapping_add(index as u64)))
        .build()
        .context("Failed to start worker pool")?;

    let jobs_total = batches(args.runs, args.batch).count() as u64;
    let progress = output.progress_bar(jobs_total, "flipping");
    let heads = Associative::new(0_u64, crate::reducers::add);

    let started = Instant::now();
    let tick = progress.clone();
    let jobs = pool.parallel(
        heads.value(),
        flip,
        reduce_with(move |acc, count: u64| {
            tick.inc(1);
            acc + count
        }),
        heads.then(),
        [Opt::queue(engine.queue_size())],
    )?;
    jobs.send_all(batches(args.runs, args.batch))
        .context("Workers stopped accepting jobs")?;

    let total = heads.get()?;
    progress.finish_and_clear();
    shutdown.shutdown();

    let percent = if args.runs == 0 {
        0.0
    } else {
        total as f64 * 100.0 / args.runs as f64
    };
    output.success(&format!(
        "{total} heads in {} flips ({percent:.2}%)",
        args.runs
    ));
    output.table_row("workers", &pool.size().to_string());
    output.table_row("jobs", &jobs_total.to_string());
    output.table_row("elapsed", &format!("{:.2?}", started.elapsed()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_cover_every_run() {
        assert_eq!(batches(25, 10).collect::<Vec<_>>(), vec![10, 10, 5]);
        assert_eq!(batches(20, 10).collect::<Vec<_>>(), vec![10, 10]);
        assert_eq!(batches(0, 10).count(), 0);
        assert_eq!(batches(3, 0).sum::<u64>(), 3);
    }

    #[test]
    fn test_flip_is_deterministic_per_seed() {
        let mut first = StdRng::seed_from_u64(7);
        let mut second = StdRng::seed_from_u64(7);
        let heads = flip(&mut first, 1000);
        assert_eq!(heads, flip(&mut second, 1000));
        assert!(heads <= 1000);
    }
}
