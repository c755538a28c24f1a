//! RAII ownership of one hazard slot.

use std::sync::atomic::{AtomicPtr, Ordering};

use crate::error::SlotExhausted;
use crate::slot::{self, DomainState, SlotId};

/// A reserved publication cell in the global slot table.
///
/// A slot is `free`, `held-null`, or `held-addr`: acquisition moves it to
/// `held-null`, [`publish`](HazardSlot::publish) and
/// [`clear`](HazardSlot::clear) toggle between the held states, and drop
/// returns it to the free-list. While a slot holds an address, no
/// retirement scan will free the node at that address.
pub struct HazardSlot {
    domain: &'static DomainState,
    id: SlotId,
}

impl HazardSlot {
    /// Reserves one slot from the global table.
    ///
    /// Fails with [`SlotExhausted`] when every slot is held. Threads are
    /// expected to acquire their slots once and keep them for their
    /// lifetime; the free-list makes capacity track thread churn rather
    /// than thread creations.
    pub fn try_acquire() -> Result<HazardSlot, SlotExhausted> {
        let domain = slot::global();
        domain.acquire().map(|id| HazardSlot { domain, id })
    }

    /// Publishes `ptr` in this slot.
    ///
    /// The store is release-ordered and followed by a store-load fence, so
    /// a subsequent reload of the atomic `ptr` was taken from cannot be
    /// ordered before the publication. Publishing replaces whatever the
    /// slot held before.
    #[inline]
    pub fn publish<T>(&self, ptr: *mut T) {
        self.domain.publish(self.id, ptr as usize);
    }

    /// Empties the slot. The previously published node becomes eligible
    /// for reclamation again.
    #[inline]
    pub fn clear(&self) {
        self.domain.clear(self.id);
    }

    /// Loads from `src` and publishes the result until a reload agrees.
    ///
    /// On return the pointer is pinned: it stays valid until the next
    /// `publish`, `protect`, or `clear` on this slot. This covers the
    /// single-source validation case; protocols that must revalidate more
    /// than one atomic use [`publish`](HazardSlot::publish) directly and
    /// reload by hand.
    #[inline]
    pub fn protect<T>(&self, src: &AtomicPtr<T>) -> *mut T {
        let mut ptr = src.load(Ordering::Acquire);
        loop {
            self.publish(ptr);
            let reload = src.load(Ordering::Acquire);
            if reload == ptr {
                return ptr;
            }
            ptr = reload;
        }
    }
}

impl Drop for HazardSlot {
    fn drop(&mut self) {
        self.domain.release(self.id);
    }
}
