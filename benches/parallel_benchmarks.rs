use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use foldpool::cli::commands::coins::flip;
use foldpool::pool::WorkerPool;
use foldpool::reducers::{Associative, add};
use foldpool::{Opt, reduce_with};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::time::Duration;

const RUNS: u64 = 1_000_000;

/// Single-threaded baseline with one local RNG
fn bench_vanilla(c: &mut Criterion) {
    c.bench_function("vanilla", |b| {
        let mut rng = StdRng::seed_from_u64(42);
        b.iter(|| black_box(flip(&mut rng, RUNS)));
    });
}

/// One job per flip: measures queue and reduction overhead
fn bench_per_flip_overhead(c: &mut Criterion) {
    let flips = 100_000_u64;
    let (pool, shutdown) = WorkerPool::builder(4)
        .init(|index| StdRng::seed_from_u64(index as u64))
        .build()
        .expect("worker pool");

    c.bench_function("per_flip_overhead", |b| {
        b.iter(|| {
            let heads = Associative::new(0_u64, add);
            let jobs = pool
                .parallel(
                    heads.value(),
                    |rng: &mut StdRng, _: ()| rng.random_bool(0.5).then_some(1_u64),
                    heads.reducer::<Option<u64>>(),
                    heads.then(),
                    [Opt::queue(1024)],
                )
                .expect("invocation");
            jobs.send_all((0..flips).map(|_| ())).expect("jobs accepted");
            black_box(heads.get().expect("heads"))
        });
    });

    shutdown.shutdown();
}

/// Flips batched into one job per worker, across pool sizes
fn bench_batched(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched");
    group.measurement_time(Duration::from_secs(5));

    let max = num_cpus::get().max(1);
    let sizes: Vec<usize> = [1, 2, 4, 8].into_iter().filter(|&n| n <= max).collect();

    for workers in sizes {
        let (pool, shutdown) = WorkerPool::builder(workers)
            .init(|index| StdRng::seed_from_u64(index as u64))
            .build()
            .expect("worker pool");

        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let (done, outcome) = crossbeam::channel::bounded(1);
                let jobs = pool
                    .parallel(
                        0_u64,
                        flip,
                        reduce_with(|acc, heads: u64| acc + heads),
                        move |result| {
                            let _ = done.send(result);
                        },
                        [],
                    )
                    .expect("invocation");
                let batch = RUNS / workers as u64;
                jobs.send_all((0..workers).map(|_| batch)).expect("jobs accepted");
                black_box(outcome.recv().expect("outcome").expect("heads"))
            });
        });

        shutdown.shutdown();
    }

    group.finish();
}

criterion_group!(benches, bench_vanilla, bench_per_flip_overhead, bench_batched);
criterion_main!(benches);
