//! Michael–Scott unbounded MPMC FIFO queue with hazard-slot reclamation.
//!
//! A singly-linked list with a permanent dummy head. `head` always names
//! the current dummy; `tail` names the last node, or lags it by exactly
//! one link while an enqueue is between its two CASes. Any thread that
//! observes the lagging tail must help advance it before retrying,
//! otherwise the laggard can wedge every other thread on the same stale
//! snapshot.
//!
//! Each participating thread reserves two hazard slots on its first
//! operation and keeps them until it exits: one pins head (or tail during
//! enqueue), the other pins the successor the operation is about to touch.
//! The first operation panics if the slot table is exhausted; raise
//! petek's `max-slots-*` feature for processes with that many threads.
//! Dequeued dummies go through [`petek::retire`] and are freed only once
//! no slot anywhere names them.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crossbeam_utils::Backoff;
use petek::{HazardSlot, retire};

use crate::utils::CacheAligned;

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    /// `None` in the dummy. Taken exactly once, by the dequeuer whose
    /// head-CAS won; that node then becomes the new dummy.
    value: UnsafeCell<Option<T>>,
}

impl<T> Node<T> {
    fn alloc(value: Option<T>) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value: UnsafeCell::new(value),
        }))
    }
}

/// Thread-resident pair of hazard slots, shared by every queue instance
/// in the process.
struct HazardPair {
    /// Pins head (dequeue) or tail (enqueue).
    primary: HazardSlot,
    /// Pins the successor node the operation dereferences.
    successor: HazardSlot,
}

impl HazardPair {
    fn reserve() -> HazardPair {
        match (HazardSlot::try_acquire(), HazardSlot::try_acquire()) {
            (Ok(primary), Ok(successor)) => HazardPair { primary, successor },
            (Err(e), _) | (_, Err(e)) => {
                panic!("petek-queue: thread cannot participate: {e}")
            }
        }
    }
}

thread_local! {
    static HAZARDS: HazardPair = HazardPair::reserve();
}

/// An unbounded lock-free multi-producer multi-consumer FIFO queue.
///
/// FIFO holds with respect to completed enqueues; concurrent in-flight
/// enqueues have no relative order. Elements are dequeued at most once.
pub struct MsQueue<T> {
    head: CacheAligned<AtomicPtr<Node<T>>>,
    tail: CacheAligned<AtomicPtr<Node<T>>>,
}

// SAFETY: nodes are only dereferenced under hazard protection and only
// freed by the retirement scan; payloads cross threads, hence `T: Send`.
unsafe impl<T: Send> Send for MsQueue<T> {}
unsafe impl<T: Send> Sync for MsQueue<T> {}

impl<T: 'static> Default for MsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> MsQueue<T> {
    /// Creates an empty queue. Head and tail both name a fresh dummy.
    pub fn new() -> MsQueue<T> {
        let dummy = Node::alloc(None);
        MsQueue {
            head: CacheAligned::new(AtomicPtr::new(dummy)),
            tail: CacheAligned::new(AtomicPtr::new(dummy)),
        }
    }

    /// Appends `value` at the tail.
    ///
    /// Lock-free: retries happen only when another thread made progress.
    /// A completed enqueue is visible to every subsequent dequeue.
    pub fn enqueue(&self, value: T) {
        let node = Node::alloc(Some(value));
        HAZARDS.with(|hz| {
            let backoff = Backoff::new();
            loop {
                // Pin the tail; protect() republishes until a reload agrees.
                let t = hz.primary.protect(&self.tail);
                let next = unsafe { (*t).next.load(Ordering::Acquire) };
                hz.successor.publish(next);
                // Both reads must still hold after the successor is pinned.
                if self.tail.load(Ordering::Acquire) != t
                    || unsafe { (*t).next.load(Ordering::Acquire) } != next
                {
                    continue;
                }
                if next.is_null() {
                    if unsafe { &(*t).next }
                        .compare_exchange(
                            ptr::null_mut(),
                            node,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        // Failure here is fine: someone already helped.
                        let _ = self.tail.compare_exchange(
                            t,
                            node,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        );
                        hz.primary.clear();
                        hz.successor.clear();
                        return;
                    }
                    backoff.spin();
                } else {
                    // Tail lags by one link; help it forward, then retry.
                    let _ =
                        self.tail
                            .compare_exchange(t, next, Ordering::AcqRel, Ordering::Acquire);
                }
            }
        })
    }

    /// Removes the element at the head.
    ///
    /// Returns `None` only for a consistently observed empty queue: head
    /// and tail name the same node and it has no successor. Lock-free.
    pub fn try_dequeue(&self) -> Option<T> {
        HAZARDS.with(|hz| {
            let backoff = Backoff::new();
            loop {
                let h = hz.primary.protect(&self.head);
                let t = self.tail.load(Ordering::Acquire);
                let next = unsafe { (*h).next.load(Ordering::Acquire) };
                hz.successor.publish(next);
                if self.head.load(Ordering::Acquire) != h
                    || unsafe { (*h).next.load(Ordering::Acquire) } != next
                {
                    continue;
                }
                if h == t {
                    if next.is_null() {
                        hz.primary.clear();
                        hz.successor.clear();
                        return None;
                    }
                    // Empty-looking head but a linked successor: the tail
                    // lags. Help before retrying.
                    let _ =
                        self.tail
                            .compare_exchange(t, next, Ordering::AcqRel, Ordering::Acquire);
                    continue;
                }
                if next.is_null() {
                    // head != tail yet no successor: torn snapshot, re-read.
                    backoff.spin();
                    continue;
                }
                if self
                    .head
                    .compare_exchange(h, next, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    // The winning CAS grants exclusive logical ownership of
                    // `h` and of the payload in `next`, the new dummy.
                    let value = unsafe { (*(*next).value.get()).take() };
                    hz.primary.clear();
                    hz.successor.clear();
                    // SAFETY: `h` is unlinked; no new reader can reach it.
                    unsafe { retire(h) };
                    return value;
                }
                backoff.spin();
            }
        })
    }

    /// Conservative emptiness test.
    ///
    /// May report non-empty while another thread is draining the last
    /// element. Do not use it as a termination signal without an external
    /// quiescence guarantee.
    pub fn is_empty(&self) -> bool {
        HAZARDS.with(|hz| {
            let h = hz.primary.protect(&self.head);
            let next = unsafe { (*h).next.load(Ordering::Acquire) };
            hz.primary.clear();
            next.is_null()
        })
    }
}

impl<T> Drop for MsQueue<T> {
    fn drop(&mut self) {
        // `&mut self`: no concurrent operation. Walk the list and free
        // everything, dummy included; undequeued payloads drop with their
        // nodes.
        let mut curr = self.head.load(Ordering::Relaxed);
        while !curr.is_null() {
            let next = unsafe { (*curr).next.load(Ordering::Relaxed) };
            unsafe { drop(Box::from_raw(curr)) };
            curr = next;
        }
    }
}
