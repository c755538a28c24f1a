//! Deferred reclamation: per-thread retired batches and the global exile
//! bag.
//!
//! A retired record is a type-erased (address, destructor) pair. Each
//! thread accumulates records in a local batch and scans it against a
//! snapshot of the slot table once the batch reaches [`SCAN_THRESHOLD`]:
//! unprotected nodes are freed, protected ones stay batched. Whatever a
//! thread cannot free by the time it exits is exiled to a global bag for
//! [`drain_retired`].

use std::cell::RefCell;
use std::sync::Mutex;

use crate::slot;

/// Batch size that triggers a reclamation scan.
pub(crate) const SCAN_THRESHOLD: usize = 64;

/// Type-erased destructor function.
type DropFn = unsafe fn(usize);

unsafe fn drop_box<T>(addr: usize) {
    // SAFETY: `addr` came from `Box::into_raw::<T>` (retire's contract)
    // and reclamation runs at most once per record.
    unsafe { drop(Box::from_raw(addr as *mut T)) };
}

/// One node awaiting reclamation.
pub(crate) struct Retired {
    addr: usize,
    drop_fn: DropFn,
}

impl Retired {
    fn new<T>(ptr: *mut T) -> Retired {
        Retired {
            addr: ptr as usize,
            drop_fn: drop_box::<T>,
        }
    }

    /// # Safety
    ///
    /// Must be called exactly once, with no hazard slot naming `addr`.
    unsafe fn free(self) {
        unsafe { (self.drop_fn)(self.addr) };
    }
}

// SAFETY: a Retired is an inert (address, destructor) pair. The exile bag
// may free it on a different thread, but only after a scan proved no
// reader still names the address; retire's contract covers the rest.
unsafe impl Send for Retired {}

/// Records handed off by exiting threads, freed by [`drain_retired`].
static EXILED: Mutex<Vec<Retired>> = Mutex::new(Vec::new());

/// The calling thread's batch. Dropped at thread exit.
struct LocalBatch {
    items: RefCell<Vec<Retired>>,
}

impl LocalBatch {
    const fn new() -> LocalBatch {
        LocalBatch {
            items: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, record: Retired) {
        let len = {
            let mut items = self.items.borrow_mut();
            items.push(record);
            items.len()
        };
        if len >= SCAN_THRESHOLD {
            self.scan();
        }
    }

    /// Free every batched node no hazard slot names; keep the rest.
    ///
    /// The batch is detached before any destructor runs: destructors may
    /// re-enter `retire` (or participate in other queues), and must find
    /// neither the `RefCell` borrow nor any reclamation lock held.
    fn scan(&self) {
        let batch = self.items.take();
        if batch.is_empty() {
            return;
        }
        let mut hazards = Vec::with_capacity(SCAN_THRESHOLD);
        slot::global().snapshot(&mut hazards);
        hazards.sort_unstable();
        let (kept, doomed): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|r| hazards.binary_search(&r.addr).is_ok());
        // Survivors go back first; a re-entrant retire appends after them.
        self.items.borrow_mut().extend(kept);
        for record in doomed {
            // SAFETY: absent from a snapshot taken after it was unlinked.
            unsafe { record.free() };
        }
    }
}

impl Drop for LocalBatch {
    fn drop(&mut self) {
        self.scan();
        let leftover = self.items.take();
        if !leftover.is_empty() {
            EXILED.lock().unwrap().extend(leftover);
        }
    }
}

thread_local! {
    static BATCH: LocalBatch = const { LocalBatch::new() };
}

/// Retires the node at `ptr`: logically deleted now, physically freed once
/// no hazard slot names it.
///
/// The record joins the calling thread's batch; a scan runs when the batch
/// reaches a threshold. Records still protected when the thread exits are
/// handed to the global exile bag for [`drain_retired`].
///
/// # Safety
///
/// - `ptr` must come from `Box::into_raw::<T>` and must not be retired or
///   freed again.
/// - `ptr` must already be unreachable for new readers: after this call no
///   thread may publish it in a hazard slot for the first time.
/// - The destructor may run on a different thread than the caller's.
pub unsafe fn retire<T>(ptr: *mut T) {
    // During TLS teardown the batch is gone; exile directly.
    if BATCH.try_with(|b| b.push(Retired::new(ptr))).is_err() {
        EXILED.lock().unwrap().push(Retired::new(ptr));
    }
}

/// Frees every retired node that no hazard slot currently protects,
/// including the calling thread's batched ones.
///
/// Intended for quiescent points (no operation in flight, every other
/// participating thread joined), where it reduces the outstanding retired
/// set to zero. Called earlier it is merely conservative: nodes
/// some slot still names stay in the exile bag for a later call.
pub fn drain_retired() {
    // Fold the caller's batch into the bag so one pass covers everything.
    let _ = BATCH.try_with(|b| {
        let local = b.items.take();
        if !local.is_empty() {
            EXILED.lock().unwrap().extend(local);
        }
    });

    let bag = std::mem::take(&mut *EXILED.lock().unwrap());
    if bag.is_empty() {
        return;
    }

    let mut hazards = Vec::with_capacity(SCAN_THRESHOLD);
    slot::global().snapshot(&mut hazards);
    hazards.sort_unstable();

    let (kept, doomed): (Vec<_>, Vec<_>) = bag
        .into_iter()
        .partition(|r| hazards.binary_search(&r.addr).is_ok());
    if !kept.is_empty() {
        EXILED.lock().unwrap().extend(kept);
    }
    for record in doomed {
        // SAFETY: unreachable since retirement, unnamed by any slot in the
        // snapshot. The bag is not locked here; destructors may re-enter.
        unsafe { record.free() };
    }
}
