use std::fmt;

/// The hazard slot table is full: more threads are participating than the
/// table has capacity for.
///
/// Fatal to the calling thread's participation. If the process legitimately
/// runs this many threads, enable one of the `max-slots-*` cargo features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotExhausted {
    pub(crate) capacity: usize,
}

impl SlotExhausted {
    /// Capacity of the table that rejected the acquisition.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Display for SlotExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hazard slot table exhausted ({} slots); enable a max-slots-* feature",
            self.capacity
        )
    }
}

impl std::error::Error for SlotExhausted {}
