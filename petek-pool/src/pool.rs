//! The worker pool: a fixed set of threads draining a shared MPMC queue.
//!
//! Workers run drain-then-sleep: dequeue and run tasks until the queue
//! reports empty, then wait on the wake sequence. Submissions pass through
//! a gate mutex whose only job is to order the "still accepting?" test
//! against stop requests; the enqueue itself is lock-free.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use petek_queue::ms_queue::MsQueue;

use crate::error::SubmitError;
use crate::task::{JoinHandle, ResultSlot, Task};
use crate::wake::WakeSeq;

struct Shared {
    queue: MsQueue<Task>,
    /// Closed for submissions once set. Queued tasks still run: workers
    /// drain on stop before exiting.
    stop: AtomicBool,
    /// Orders submit's acceptance test against request_stop. Either the
    /// enqueue lands before the flag is set (and the final drain runs the
    /// task), or the test observes the flag and nothing is enqueued.
    submit_gate: Mutex<()>,
    wake: WakeSeq,
}

/// A fixed-size pool of worker threads fed by a lock-free MPMC queue.
///
/// Dropping the pool stops it, joins every worker, and then drains the
/// retirement exile bag; every task accepted before the stop runs to
/// completion first.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns a pool with `workers` threads. Zero is interpreted as one.
    pub fn new(workers: usize) -> WorkerPool {
        let count = workers.max(1);
        let shared = Arc::new(Shared {
            queue: MsQueue::new(),
            stop: AtomicBool::new(false),
            submit_gate: Mutex::new(()),
            wake: WakeSeq::new(),
        });
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("petek-worker-{index}"))
                .spawn(move || worker_loop(&shared))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
        WorkerPool {
            shared,
            workers: handles,
        }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submits `job`; the returned handle eventually carries its result.
    ///
    /// Success means the job will run, even if the pool stops right after.
    /// Fails with [`SubmitError::Stopped`] once [`request_stop`] ran, in
    /// which case the job was never enqueued.
    ///
    /// [`request_stop`]: WorkerPool::request_stop
    pub fn submit<F, R>(&self, job: F) -> Result<JoinHandle<R>, SubmitError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let _gate = self.shared.submit_gate.lock().unwrap();
        if self.shared.stop.load(Ordering::Acquire) {
            return Err(SubmitError::Stopped);
        }
        let slot = Arc::new(ResultSlot::new());
        let task_slot = Arc::clone(&slot);
        self.shared.queue.enqueue(Task::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            task_slot.fulfill(result);
        }));
        self.shared.wake.bump_one();
        Ok(JoinHandle::new(slot))
    }

    /// Stops accepting submissions. Idempotent, safe to race with
    /// `submit`. Already-queued tasks still run before the workers exit.
    pub fn request_stop(&self) {
        let _gate = self.shared.submit_gate.lock().unwrap();
        let stop = &self.shared.stop;
        self.shared
            .wake
            .bump_all_with(|| stop.store(true, Ordering::Release));
    }
}

impl Default for WorkerPool {
    /// A pool sized to the machine's available parallelism.
    fn default() -> WorkerPool {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        WorkerPool::new(workers)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.request_stop();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        // Only now is the exile bag provably free of worker hazards;
        // draining before the joins could free nodes a live worker still
        // has published.
        petek::drain_retired();
    }
}

fn worker_loop(shared: &Shared) {
    let mut seen = 0u64;
    loop {
        while let Some(task) = shared.queue.try_dequeue() {
            task.run();
        }
        if shared.stop.load(Ordering::Acquire) {
            // Drain-on-stop: everything accepted before the flag must run.
            while let Some(task) = shared.queue.try_dequeue() {
                task.run();
            }
            return;
        }
        seen = shared
            .wake
            .wait_past(seen, || shared.stop.load(Ordering::Acquire));
    }
}
