//! Submission stress and stop-drain accounting.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use petek_pool::WorkerPool;

#[test]
#[cfg_attr(miri, ignore)]
fn million_increments() {
    const TASKS: usize = 1_000_000;

    let pool = WorkerPool::new(8);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..TASKS {
        let counter = counter.clone();
        pool.submit(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    // Drop stops the pool and drains every accepted task before joining.
    drop(pool);
    assert_eq!(counter.load(Ordering::SeqCst), TASKS);
}

#[test]
#[cfg_attr(miri, ignore)]
fn stop_drains_every_accepted_task() {
    const TASKS: usize = 10_000;

    let pool = WorkerPool::new(4);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..TASKS {
        let counter = counter.clone();
        pool.submit(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    pool.request_stop();
    drop(pool);
    assert_eq!(counter.load(Ordering::SeqCst), TASKS);
}
