//! # Frame Cursor
//!
//! Which mirror slot the current frame writes.

/// Frame lifecycle helper for `K` frames in flight.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut cursor = FrameCursor::new(config.frames_in_flight);
///
/// loop {
///     // Wait until the work that last read this slot has finished
///     let slot = cursor.current_slot();
///     coordinator.flush_buffered::<DeviceTransform>(slot, &mut mirror)?;
///     // ...record and submit work reading slot `slot`
///     cursor.advance();
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameCursor {
    /// Number of slots.
    frames_in_flight: usize,
    /// Frames advanced since creation.
    frame: u64,
}

impl FrameCursor {
    /// Creates a cursor at frame 0, slot 0.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is zero.
    #[must_use]
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight > 0, "at least one frame in flight is required");
        Self {
            frames_in_flight,
            frame: 0,
        }
    }

    /// Slot used by the current frame.
    #[inline]
    #[must_use]
    pub fn current_slot(&self) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        let slot = (self.frame % self.frames_in_flight as u64) as usize;
        slot
    }

    /// Moves to the next frame and returns its slot.
    #[inline]
    pub fn advance(&mut self) -> usize {
        self.frame += 1;
        self.current_slot()
    }

    /// Frames advanced since creation.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }
}
