use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use petek_pool::{SubmitError, WorkerPool};

#[test]
fn single_task_resolves() {
    let pool = WorkerPool::new(2);
    let handle = pool.submit(|| [1, 2, 3, 4, 5].iter().sum::<i64>()).unwrap();
    assert_eq!(handle.join().unwrap(), 15);
}

#[test]
#[cfg_attr(miri, ignore)]
fn chunked_parallel_sum() {
    const CHUNK: u64 = 1_000_000;
    const CHUNKS: u64 = 100;

    let pool = WorkerPool::new(8);
    let handles: Vec<_> = (0..CHUNKS)
        .map(|c| {
            pool.submit(move || {
                let lo = c * CHUNK + 1;
                let hi = (c + 1) * CHUNK;
                (lo..=hi).sum::<u64>()
            })
            .unwrap()
        })
        .collect();

    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 5_000_000_050_000_000);
}

#[test]
fn zero_workers_becomes_one() {
    let pool = WorkerPool::new(0);
    assert_eq!(pool.size(), 1);
    let handle = pool.submit(|| 7).unwrap();
    assert_eq!(handle.join().unwrap(), 7);
}

#[test]
fn submit_after_stop_is_rejected() {
    let pool = WorkerPool::new(2);
    let ran = Arc::new(AtomicUsize::new(0));

    pool.request_stop();
    let ran_in_task = ran.clone();
    let err = pool
        .submit(move || {
            ran_in_task.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap_err();
    assert_eq!(err, SubmitError::Stopped);

    // The rejected task was never enqueued: the drain on drop finds nothing.
    drop(pool);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn request_stop_is_idempotent() {
    let pool = WorkerPool::new(2);
    let handle = pool.submit(|| 1).unwrap();
    pool.request_stop();
    pool.request_stop();
    pool.request_stop();
    // The task accepted before the stop still runs.
    assert_eq!(handle.join().unwrap(), 1);
}

#[test]
fn task_panic_reaches_join() {
    let pool = WorkerPool::new(1);
    let handle = pool.submit(|| -> u32 { panic!("task exploded") }).unwrap();
    let payload = handle.join().unwrap_err();
    let message = payload.downcast_ref::<&str>().copied().unwrap_or_default();
    assert!(message.contains("task exploded"));

    // The worker survives a panicking task.
    let ok = pool.submit(|| 3).unwrap();
    assert_eq!(ok.join().unwrap(), 3);
}

#[test]
fn is_finished_tracks_completion() {
    let pool = WorkerPool::new(1);
    let handle = pool.submit(|| 11).unwrap();
    // Joinable exactly once; is_finished is just a peek.
    while !handle.is_finished() {
        std::thread::yield_now();
    }
    assert_eq!(handle.join().unwrap(), 11);
}
