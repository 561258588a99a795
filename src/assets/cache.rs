use std::sync::Arc;

use crate::assets::decode::PreparedFrame;
use crate::foundation::core::FrameIndex;

/// Outcome of publishing a decoded frame into the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Publish {
    /// Slot was empty and now holds the frame.
    Stored,
    /// Slot already held a frame; the new one was dropped.
    AlreadyPresent,
    /// Index is outside the sequence.
    OutOfRange,
    /// Cache was released; nothing is stored anymore.
    Released,
}

/// Fixed-size arena of decoded frames, indexed by frame number.
///
/// Slots are written at most once while the cache is live and only cleared in bulk by
/// [`FrameCache::release_all`]. Reads tolerate empty slots.
#[derive(Debug)]
pub struct FrameCache {
    slots: Vec<Option<Arc<PreparedFrame>>>,
    loaded: usize,
    bytes: usize,
    released: bool,
}

impl FrameCache {
    pub fn new(frame_count: u32) -> Self {
        Self {
            slots: vec![None; frame_count as usize],
            loaded: 0,
            bytes: 0,
            released: false,
        }
    }

    pub fn publish(&mut self, index: FrameIndex, frame: Arc<PreparedFrame>) -> Publish {
        if self.released {
            return Publish::Released;
        }
        let Some(slot) = self.slots.get_mut(index.as_usize()) else {
            return Publish::OutOfRange;
        };
        if slot.is_some() {
            return Publish::AlreadyPresent;
        }
        self.bytes += frame.byte_len();
        self.loaded += 1;
        *slot = Some(frame);
        Publish::Stored
    }

    pub fn get(&self, index: FrameIndex) -> Option<&Arc<PreparedFrame>> {
        self.slots.get(index.as_usize()).and_then(Option::as_ref)
    }

    pub fn contains(&self, index: FrameIndex) -> bool {
        self.get(index).is_some()
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    /// Pixel bytes currently retained.
    pub fn retained_bytes(&self) -> usize {
        self.bytes
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Drop every decoded frame and refuse further writes. Returns the bytes freed.
    pub fn release_all(&mut self) -> usize {
        let freed = self.bytes;
        for slot in &mut self.slots {
            *slot = None;
        }
        self.loaded = 0;
        self.bytes = 0;
        self.released = true;
        freed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
