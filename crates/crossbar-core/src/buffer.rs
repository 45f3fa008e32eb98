//! Host-side buffer pool for slot-addressed processing.
//!
//! Block-based audio hosts often reuse one buffer slot for several signals: a
//! node's output may be written into the very slot its input was read from.
//! [`BufferPool`] models that arrangement so the mixing engine can be driven
//! with input and output *slot indices* that are allowed to alias, see
//! [`MixEngine::process_slots`](crate::MixEngine::process_slots).

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Pool of equally sized mono sample buffers.
#[derive(Debug, Clone)]
pub struct BufferPool {
    slots: Vec<Vec<f32>>,
    block_size: usize,
}

impl BufferPool {
    /// Creates `count` zeroed slots of `block_size` samples.
    pub fn new(count: usize, block_size: usize) -> Self {
        Self {
            slots: (0..count).map(|_| vec![0.0; block_size]).collect(),
            block_size,
        }
    }

    /// Number of slots.
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Samples per slot.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The samples of slot `idx`, or `None` if it does not exist.
    #[inline]
    pub fn slot(&self, idx: usize) -> Option<&[f32]> {
        self.slots.get(idx).map(Vec::as_slice)
    }

    /// Mutable samples of slot `idx`, or `None` if it does not exist.
    #[inline]
    pub fn slot_mut(&mut self, idx: usize) -> Option<&mut [f32]> {
        self.slots.get_mut(idx).map(Vec::as_mut_slice)
    }

    /// Fills every slot with zeros.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.fill(0.0);
        }
    }

    /// Resizes every slot, zeroing new samples.
    pub fn resize(&mut self, block_size: usize) {
        for slot in &mut self.slots {
            slot.resize(block_size, 0.0);
        }
        self.block_size = block_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_zeroed_and_sized() {
        let pool = BufferPool::new(3, 16);
        assert_eq!(pool.count(), 3);
        assert_eq!(pool.block_size(), 16);
        assert!(pool.slot(2).unwrap().iter().all(|&s| s == 0.0));
        assert!(pool.slot(3).is_none());
    }

    #[test]
    fn resize_and_clear() {
        let mut pool = BufferPool::new(1, 4);
        pool.slot_mut(0).unwrap().fill(1.0);
        pool.resize(8);
        assert_eq!(pool.slot(0).unwrap(), &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        pool.clear();
        assert!(pool.slot(0).unwrap().iter().all(|&s| s == 0.0));
    }
}
