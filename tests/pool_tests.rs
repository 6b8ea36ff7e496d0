use anyhow::Result;
use foldpool::pool::WorkerPool;
use foldpool::reducers::{Associative, add};
use foldpool::{Opt, ParallelError, identity};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_init_once_per_worker_across_invocations() -> Result<()> {
    let inits = Arc::new(AtomicUsize::new(0));
    let destroys = Arc::new(AtomicUsize::new(0));
    let init_counter = inits.clone();
    let destroy_counter = destroys.clone();

    let (pool, shutdown) = WorkerPool::builder(4)
        .init(move |index| {
            init_counter.fetch_add(1, Ordering::SeqCst);
            index
        })
        .destroy(move |_| {
            destroy_counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()?;

    for round in 0..10_i64 {
        let sum = Associative::new(0_i64, add);
        let jobs = pool.parallel(sum.value(), identity, sum.reducer::<i64>(), sum.then(), [])?;
        jobs.send_all((0..100).map(|n| n + round))?;
        assert_eq!(sum.get()?, 4950 + 100 * round);
    }

    assert_eq!(inits.load(Ordering::SeqCst), 4);
    assert_eq!(destroys.load(Ordering::SeqCst), 0);

    shutdown.shutdown();
    assert_eq!(destroys.load(Ordering::SeqCst), 4);

    println!("✓ 10 invocations on one pool, init and destroy ran once per worker");
    Ok(())
}

#[test]
fn test_mapper_sees_its_own_worker_state() -> Result<()> {
    let (pool, shutdown) = WorkerPool::builder(3).init(|index| (index, 0_usize)).build()?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let sum = Associative::new(0_usize, add);
    let jobs = pool.parallel(
        sum.value(),
        move |state: &mut (usize, usize), job: usize| {
            state.1 += 1;
            recorder.lock().expect("recorder lock").push(state.0);
            job
        },
        sum.reducer::<usize>(),
        sum.then(),
        [],
    )?;
    jobs.send_all(0..300)?;

    assert_eq!(sum.get()?, (0..300).sum::<usize>());
    let seen = seen.lock().expect("recorder lock");
    assert_eq!(seen.len(), 300);
    assert!(seen.iter().all(|index| *index < 3));

    shutdown.shutdown();
    Ok(())
}

#[test]
fn test_mapper_panic_poisons_pool() -> Result<()> {
    let (pool, _shutdown) = WorkerPool::new(2)?;

    let sum = Associative::new(0_i64, add);
    let jobs = pool.parallel(
        sum.value(),
        |_: &mut (), n: i64| -> i64 {
            if n == 5 {
                panic!("junk");
            }
            n
        },
        sum.reducer::<i64>(),
        sum.then(),
        [],
    )?;
    jobs.send_all(0..10)?;

    let err = sum.get().unwrap_err();
    assert_eq!(err.trapped().map(|panic| panic.payload()), Some("junk"));
    assert!(pool.is_poisoned());
    assert!(matches!(pool.fault(), Some(ParallelError::Trapped(_))));
    Ok(())
}

#[test]
fn test_panicked_worker_is_destroyed_and_pool_refuses_work() -> Result<()> {
    let destroys = Arc::new(AtomicUsize::new(0));
    let counter = destroys.clone();
    let (pool, shutdown) = WorkerPool::builder(3)
        .destroy(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()?;

    let sum = Associative::new(0_i64, add);
    let jobs = pool.parallel(
        sum.value(),
        |_: &mut (), n: i64| -> i64 {
            if n == 5 {
                panic!("junk");
            }
            n
        },
        sum.reducer::<i64>(),
        sum.then(),
        [],
    )?;
    jobs.send_all(0..10)?;
    assert!(sum.get().is_err());

    // The panicked worker runs `destroy` on its way out.
    let deadline = Instant::now() + Duration::from_secs(10);
    while destroys.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(destroys.load(Ordering::SeqCst), 1);

    let rejected = panic::catch_unwind(AssertUnwindSafe(|| {
        let sum = Associative::new(0_i64, add);
        pool.parallel(sum.value(), identity, sum.reducer::<i64>(), sum.then(), [])
    }))
    .unwrap_err();
    let message = rejected
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(message.contains("poisoned"), "{message}");
    assert!(message.contains("junk"), "{message}");

    shutdown.shutdown();
    assert_eq!(destroys.load(Ordering::SeqCst), 3);

    println!("✓ Panicked worker destroyed once, the rest at shutdown");
    Ok(())
}

#[test]
#[should_panic(expected = "poisoned")]
fn test_poisoned_pool_rejects_new_invocations() {
    let (pool, shutdown) = WorkerPool::new(1).expect("pool");
    shutdown.shutdown();

    let sum = Associative::new(0_i64, add);
    let _jobs = pool.parallel(sum.value(), identity, sum.reducer::<i64>(), sum.then(), []);
}

#[test]
fn test_shutdown_waits_for_running_invocation() -> Result<()> {
    let (pool, shutdown) = WorkerPool::new(2)?;

    let sum = Associative::new(0_i64, add);
    let jobs = pool.parallel(
        sum.value(),
        |_: &mut (), n: i64| {
            thread::sleep(Duration::from_millis(1));
            n
        },
        sum.reducer::<i64>(),
        sum.then(),
        [Opt::queue(4)],
    )?;

    let stopper = thread::spawn(move || shutdown.shutdown());
    while !pool.is_poisoned() {
        thread::sleep(Duration::from_millis(1));
    }
    jobs.send_all(0..50)?;
    stopper.join().expect("shutdown thread");

    // The pool was shut down while the invocation ran.
    let err = sum.get().unwrap_err();
    assert!(matches!(err, ParallelError::PoolShutDown));
    assert!(pool.is_poisoned());
    Ok(())
}

#[test]
fn test_dropped_shutdown_returns_once_queues_close() -> Result<()> {
    let destroys = Arc::new(AtomicUsize::new(0));
    let counter = destroys.clone();
    let (pool, shutdown) = WorkerPool::builder(2)
        .destroy(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()?;

    let sum = Associative::new(0_i64, add);
    let jobs = pool.parallel(sum.value(), identity, sum.reducer::<i64>(), sum.then(), [])?;
    jobs.send_all(1..=4)?;

    let dropper = thread::spawn(move || drop(shutdown));
    dropper.join().expect("drop thread");
    assert_eq!(destroys.load(Ordering::SeqCst), 2);

    // The invocation either finished first or saw the shutdown.
    match sum.get() {
        Ok(total) => assert_eq!(total, 10),
        Err(err) => assert!(matches!(err, ParallelError::PoolShutDown)),
    }
    Ok(())
}

#[test]
fn test_concurrent_invocations_share_a_pool() -> Result<()> {
    let (pool, shutdown) = WorkerPool::new(2)?;

    let first = Associative::new(0_i64, add);
    let second = Associative::new(0_i64, add);
    let a = pool.parallel(first.value(), identity, first.reducer::<i64>(), first.then(), [])?;
    let b = pool.parallel(second.value(), identity, second.reducer::<i64>(), second.then(), [])?;

    let feeder = thread::spawn(move || b.send_all(0..100).is_ok());
    a.send_all(0..10)?;
    assert!(feeder.join().expect("feeder thread"));

    assert_eq!(first.get()?, 45);
    assert_eq!(second.get()?, 4950);
    shutdown.shutdown();
    Ok(())
}
