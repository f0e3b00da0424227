//! # Dirty Tracking
//!
//! Compact bitset of dirty entity ids, one per mirror slot.

/// Dirty tracking bitset.
///
/// Each bit is one entity id. At 64 ids per `u64`, tracking 1M entities takes
/// about 122KB. The bitset grows on demand, so the first mark past the
/// reserved range allocates once.
///
/// ## Performance
///
/// - Mark / unmark: O(1)
/// - Clear all: O(n/64) where n = highest tracked id
/// - Iterate dirty: O(n/64 + dirty_count), ascending id order
#[derive(Clone, Debug, Default)]
pub struct DirtyTracker {
    /// Bitset: 1 = dirty, 0 = clean. 64 ids per u64.
    bits: Vec<u64>,
    /// Cached count of dirty ids.
    dirty_count: usize,
}

impl DirtyTracker {
    /// Creates a tracker with room for ids in `[0, capacity)`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0u64; capacity.div_ceil(64)],
            dirty_count: 0,
        }
    }

    /// Makes room for ids in `[0, capacity)` without losing marks.
    pub fn reserve(&mut self, capacity: usize) {
        let words = capacity.div_ceil(64);
        if words > self.bits.len() {
            self.bits.resize(words, 0);
        }
    }

    /// Marks an id as dirty.
    #[inline]
    pub fn mark(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let mask = 1u64 << (index % 64);
        if self.bits[word] & mask == 0 {
            self.bits[word] |= mask;
            self.dirty_count += 1;
        }
    }

    /// Clears one id's dirty bit.
    #[inline]
    pub fn unmark(&mut self, index: usize) {
        let mask = 1u64 << (index % 64);
        if let Some(word) = self.bits.get_mut(index / 64) {
            if *word & mask != 0 {
                *word &= !mask;
                self.dirty_count -= 1;
            }
        }
    }

    /// Checks if an id is dirty.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self, index: usize) -> bool {
        let word = self.bits.get(index / 64).copied().unwrap_or(0);
        (word >> (index % 64)) & 1 == 1
    }

    /// Clears all dirty flags.
    pub fn clear(&mut self) {
        if self.dirty_count > 0 {
            self.bits.fill(0);
            self.dirty_count = 0;
        }
    }

    /// Returns the number of dirty ids.
    #[inline]
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty_count
    }

    /// Checks if any id is dirty.
    #[inline]
    #[must_use]
    pub fn has_dirty(&self) -> bool {
        self.dirty_count > 0
    }

    /// Iterates over dirty ids in ascending order.
    ///
    /// Uses `trailing_zeros` to skip clean regions.
    pub fn iter_dirty(&self) -> DirtyIterator<'_> {
        DirtyIterator {
            bits: &self.bits,
            word_idx: 0,
            current_word: self.bits.first().copied().unwrap_or(0),
        }
    }
}

/// Iterator over dirty ids.
pub struct DirtyIterator<'a> {
    bits: &'a [u64],
    word_idx: usize,
    current_word: u64,
}

impl Iterator for DirtyIterator<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit = self.current_word.trailing_zeros() as usize;
                // Clear lowest set bit
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * 64 + bit);
            }

            self.word_idx += 1;
            self.current_word = *self.bits.get(self.word_idx)?;
        }
    }
}
