//! The hazard slot table and global domain state.
//!
//! The table is an immortal process singleton: a leaked array of
//! single-address publication cells, a high-water mark, and a free-list of
//! indices returned by exited threads. Acquisition happens at most a
//! couple of times per thread lifetime, so the free-list sits behind a
//! plain mutex.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering, fence};

use once_cell::race::OnceBox;

// Maximum hazard slots. Configurable via cargo features:
//   petek = { features = ["max-slots-4096"] }
// Default: 1024.
#[cfg(feature = "max-slots-4096")]
pub(crate) const MAX_SLOTS: usize = 4096;
#[cfg(all(feature = "max-slots-2048", not(feature = "max-slots-4096")))]
pub(crate) const MAX_SLOTS: usize = 2048;
#[cfg(not(any(feature = "max-slots-2048", feature = "max-slots-4096")))]
pub(crate) const MAX_SLOTS: usize = 1024;

/// One publication cell. Null means the owning thread is not protecting
/// anything. Padded so publishing threads do not false-share.
#[repr(align(128))]
struct SlotCell {
    addr: AtomicUsize,
}

/// Opaque index of an acquired slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotId(usize);

/// Global domain state: the slot table plus its allocator.
pub(crate) struct DomainState {
    slots: &'static [SlotCell],
    /// High-water mark of ever-allocated indices; scans stop here.
    next: AtomicUsize,
    /// Indices recycled by exited threads.
    free: Mutex<Vec<usize>>,
}

impl DomainState {
    fn new() -> Self {
        let mut cells = Vec::with_capacity(MAX_SLOTS);
        for _ in 0..MAX_SLOTS {
            cells.push(SlotCell {
                addr: AtomicUsize::new(0),
            });
        }
        Self {
            slots: Box::leak(cells.into_boxed_slice()),
            next: AtomicUsize::new(0),
            free: Mutex::new(Vec::new()),
        }
    }

    /// Reserve one slot, preferring a recycled index.
    pub(crate) fn acquire(&self) -> Result<SlotId, crate::SlotExhausted> {
        {
            let mut free = self.free.lock().unwrap();
            if let Some(index) = free.pop() {
                return Ok(SlotId(index));
            }
        }
        // CAS loop: only bump on success so the mark never overshoots the
        // table when acquisition races with exhaustion.
        loop {
            let current = self.next.load(Ordering::Relaxed);
            if current >= MAX_SLOTS {
                return Err(crate::SlotExhausted {
                    capacity: MAX_SLOTS,
                });
            }
            match self.next.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(SlotId(current)),
                Err(_) => continue,
            }
        }
    }

    /// Clear the slot and return its index to the free-list.
    pub(crate) fn release(&self, id: SlotId) {
        self.slots[id.0].addr.store(0, Ordering::Release);
        let mut free = self.free.lock().unwrap();
        free.push(id.0);
    }

    /// Release store plus the store-load fence that keeps the validation
    /// reload from being ordered before the publication.
    #[inline]
    pub(crate) fn publish(&self, id: SlotId, addr: usize) {
        self.slots[id.0].addr.store(addr, Ordering::Release);
        fence(Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn clear(&self, id: SlotId) {
        self.slots[id.0].addr.store(0, Ordering::Release);
    }

    /// Append every currently-published address to `out`.
    ///
    /// Not linearizable against publishers; an address published before
    /// the scan started in the publisher's program order is guaranteed to
    /// appear.
    pub(crate) fn snapshot(&self, out: &mut Vec<usize>) {
        let high = self.next.load(Ordering::Acquire).min(MAX_SLOTS);
        for cell in &self.slots[..high] {
            let addr = cell.addr.load(Ordering::Acquire);
            if addr != 0 {
                out.push(addr);
            }
        }
    }
}

/// Global singleton instance
static GLOBAL: OnceBox<DomainState> = OnceBox::new();

/// Get a reference to the global domain state
#[inline]
pub(crate) fn global() -> &'static DomainState {
    GLOBAL.get_or_init(|| Box::new(DomainState::new()))
}
