//! Out-of-order completion store drained in index order.

use framepipe_core::FrameIndex;
use std::collections::HashMap;

/// Completed-but-unconsumed frames keyed by index.
///
/// Each index is held at most once and leaves the buffer when it is taken.
#[derive(Debug)]
pub struct ReorderBuffer<F> {
    slots: HashMap<FrameIndex, F>,
}

impl<F> ReorderBuffer<F> {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Store a completed frame. If `index` is already held the buffer is left
    /// unchanged and `frame` is handed back.
    pub fn insert(&mut self, index: FrameIndex, frame: F) -> Result<(), F> {
        use std::collections::hash_map::Entry;
        match self.slots.entry(index) {
            Entry::Occupied(_) => Err(frame),
            Entry::Vacant(slot) => {
                slot.insert(frame);
                Ok(())
            }
        }
    }

    #[inline]
    pub fn contains(&self, index: FrameIndex) -> bool {
        self.slots.contains_key(&index)
    }

    /// Remove and return the frame at `index`.
    #[inline]
    pub fn take(&mut self, index: FrameIndex) -> Option<F> {
        self.slots.remove(&index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Remove every held frame.
    pub fn drain(&mut self) -> impl Iterator<Item = (FrameIndex, F)> + '_ {
        self.slots.drain()
    }
}

impl<F> Default for ReorderBuffer<F> {
    fn default() -> Self {
        Self::new()
    }
}
