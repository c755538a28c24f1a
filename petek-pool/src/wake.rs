//! Wake coordination between submitters and sleeping workers.
//!
//! A naive "notify when work arrives" protocol loses wakeups: a worker
//! that just drained the queue empty but has not yet reached its wait can
//! miss the notify and sleep on a non-empty queue. The sequence counter
//! turns "work may be available" into an event count. Every submission
//! (and every stop request) advances `seq` under the lock; a worker sleeps
//! only while `seq` still equals the value it recorded at its last wake.
//! An increment landing between drain and wait flips the predicate, so the
//! wait returns immediately instead of sleeping.

use std::sync::{Condvar, Mutex};

pub(crate) struct WakeSeq {
    seq: Mutex<u64>,
    available: Condvar,
}

impl WakeSeq {
    pub(crate) fn new() -> WakeSeq {
        WakeSeq {
            seq: Mutex::new(0),
            available: Condvar::new(),
        }
    }

    /// Advances the sequence and wakes one sleeper. The notify runs after
    /// the lock is released; the event count makes that safe.
    pub(crate) fn bump_one(&self) {
        {
            let mut seq = self.seq.lock().unwrap();
            *seq += 1;
        }
        self.available.notify_one();
    }

    /// Runs `f` under the lock, advances the sequence, and wakes every
    /// sleeper. The stop path sets its flag inside `f`, so no waiter can
    /// re-check the predicate between the flag store and the increment.
    pub(crate) fn bump_all_with(&self, f: impl FnOnce()) {
        {
            let mut seq = self.seq.lock().unwrap();
            f();
            *seq += 1;
        }
        self.available.notify_all();
    }

    /// Blocks until the sequence moves past `seen` or `stop` reports true.
    /// Returns the sequence observed on exit; the caller records it for
    /// the next wait.
    pub(crate) fn wait_past(&self, seen: u64, stop: impl Fn() -> bool) -> u64 {
        let mut seq = self.seq.lock().unwrap();
        while *seq == seen && !stop() {
            seq = self.available.wait(seq).unwrap();
        }
        *seq
    }
}
