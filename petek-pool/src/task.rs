//! Task handles and the one-shot result channel.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

/// A queued unit of work: a nullary, move-only callable. Running it
/// fulfills the submitter's [`JoinHandle`] as a side effect; the pool
/// never looks inside.
pub(crate) struct Task {
    job: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    pub(crate) fn new(job: impl FnOnce() + Send + 'static) -> Task {
        Task { job: Box::new(job) }
    }

    pub(crate) fn run(self) {
        (self.job)()
    }
}

/// Write-once slot a task fulfills and a join handle waits on.
pub(crate) struct ResultSlot<R> {
    value: Mutex<Option<thread::Result<R>>>,
    ready: Condvar,
}

impl<R> ResultSlot<R> {
    pub(crate) fn new() -> ResultSlot<R> {
        ResultSlot {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn fulfill(&self, result: thread::Result<R>) {
        let mut value = self.value.lock().unwrap();
        *value = Some(result);
        self.ready.notify_one();
    }
}

/// Owned handle to a submitted task's eventual result.
///
/// Mirrors [`std::thread::JoinHandle`]: [`join`](JoinHandle::join) blocks
/// until the task ran, yielding `Err` with the panic payload if the task
/// panicked.
pub struct JoinHandle<R> {
    slot: Arc<ResultSlot<R>>,
}

impl<R> std::fmt::Debug for JoinHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad("JoinHandle { .. }")
    }
}

impl<R> JoinHandle<R> {
    pub(crate) fn new(slot: Arc<ResultSlot<R>>) -> JoinHandle<R> {
        JoinHandle { slot }
    }

    /// Waits for the task to finish and takes its result.
    pub fn join(self) -> thread::Result<R> {
        let mut value = self.slot.value.lock().unwrap();
        loop {
            if let Some(result) = value.take() {
                return result;
            }
            value = self.slot.ready.wait(value).unwrap();
        }
    }

    /// Whether the task already ran to completion (or panicked).
    pub fn is_finished(&self) -> bool {
        self.slot.value.lock().unwrap().is_some()
    }
}
