use anyhow::{Context, Result};
use clap::Args;
use std::ops::Range;
use std::time::Instant;

use crate::cli::output::Output;
use crate::config::EngineConfig;
use crate::parallel::parallel;
use crate::reducers::{Associative, add};

#[derive(Args, Debug)]
pub struct PrimesArgs {
    /// Count primes strictly below this number
    #[arg(short, long, default_value_t = 1_000_000)]
    pub limit: u64,

    /// Numbers per job
    #[arg(short, long, default_value_t = 10_000)]
    pub chunk: u64,
}

/// Split `0..limit` into consecutive ranges of at most `chunk` numbers
pub fn chunks(limit: u64, chunk: u64) -> impl Iterator<Item = Range<u64>> {
    let chunk = chunk.max(1);
    (0..limit)
        .step_by(chunk as usize)
        .map(move |start| start..limit.min(start.saturating_add(chunk)))
}

pub fn is_prime(n: u64) -> bool {
    if n < 4 {
        return n >= 2;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut divisor = 3;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

pub fn execute(args: PrimesArgs, engine: &EngineConfig, output: &Output) -> Result<()> {
    let count = Associative::new(0_u64, add);
    let started = Instant::now();

    let jobs = parallel(
        count.value(),
        |_: &mut (), range: Range<u64>| range.filter(|&n| is_prime(n)).count() as u64,
        count.reducer::<u64>(),
        count.then(),
        engine.options(),
    )?;
    jobs.send_all(chunks(args.limit, args.chunk))
        .context("Workers stopped accepting jobs")?;

    let primes = count.get()?;
    output.success(&format!("{primes} primes below {}", args.limit));
    output.table_row("workers", &engine.pool_size().to_string());
    output.table_row("elapsed", &format!("{:.2?}", started.elapsed()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_prime() {
        let small: Vec<u64> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(small, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(is_prime(7919));
        assert!(!is_prime(7917));
        assert!(is_prime(1_000_000_007));
        assert!(!is_prime(65_521 * 65_521));
        assert!(!is_prime(u64::MAX));
    }

    #[test]
    fn test_chunks_cover_range() {
        let ranges: Vec<Range<u64>> = chunks(25, 10).collect();
        assert_eq!(ranges, vec![0..10, 10..20, 20..25]);
        assert_eq!(chunks(0, 10).count(), 0);
    }
}
