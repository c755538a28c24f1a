//! Petek: slot-based hazard pointers with batched deferred reclamation.
//!
//! A thread that wants to dereference a pointer loaded from shared memory
//! first publishes it in a reserved slot of a process-wide table. Retired
//! nodes are freed in batches, and only once a scan of the table proves no
//! slot names them. Readers pay one atomic store and one fence per
//! protected load; writers pay nothing until their retired batch fills.
//!
//! # Key Features
//!
//! - **Bounded memory**: at most `batch × threads` retired nodes plus the
//!   live set are ever outstanding
//! - **Lock-free reads**: publication never blocks; the only mutex guards
//!   the slot free-list, taken at most twice per thread lifetime
//! - **Slot recycling**: exiting threads return their slots, so capacity
//!   tracks thread churn rather than thread creations
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicPtr, Ordering};
//! use petek::{retire, HazardSlot};
//!
//! let shared = AtomicPtr::new(Box::into_raw(Box::new(42u32)));
//!
//! let slot = HazardSlot::try_acquire().expect("slot table full");
//!
//! // Load-and-publish until a reload agrees; the node is now pinned.
//! let ptr = slot.protect(&shared);
//! assert_eq!(unsafe { *ptr }, 42);
//! slot.clear();
//!
//! // Unlink, then hand the node to the retirement engine.
//! let old = shared.swap(std::ptr::null_mut(), Ordering::AcqRel);
//! unsafe { retire(old) };
//! petek::drain_retired();
//! ```

#![warn(missing_docs)]

mod error;
mod hazard;
mod retired;
mod slot;

pub use error::SlotExhausted;
pub use hazard::HazardSlot;
pub use retired::{drain_retired, retire};
