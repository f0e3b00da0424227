//! # Device Mirror Contract
//!
//! The sync layer never talks to a graphics API. It hands a list of copy
//! spans to a [`DeviceMirror`], which owns the actual transfer (a mapped
//! buffer write, a staging upload, a queue copy command...).
//!
//! ```text
//!  dense array of T (host)            mirror (device)
//! ┌──┬──┬──┬──┬──┬──┐        ┌─────────── slot 0 ───────────┬─── slot 1 ───...
//! │e7│e2│e9│e4│e1│e5│  ───►  │ [span: dst = k*slot + off, bytes]
//! └──┴──┴──┴──┴──┴──┘        └──────────────────────────────┴──────────────...
//! ```

use crate::error::{EcsError, EcsResult};

/// One contiguous copy into a mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopySpan<'a> {
    /// Destination byte offset inside the whole mirror (slot base included).
    pub dst_offset: usize,
    /// Source bytes, borrowed from a component store's dense array.
    pub bytes: &'a [u8],
}

impl CopySpan<'_> {
    /// Size of the copy in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// One past the last destination byte.
    #[inline]
    #[must_use]
    pub fn dst_end(&self) -> usize {
        self.dst_offset + self.bytes.len()
    }
}

/// External write target the sync layer keeps up to date.
///
/// Implementations must finish reading `spans` before returning; the source
/// bytes are only borrowed for the duration of the call.
pub trait DeviceMirror {
    /// Copies every span into the mirror. Spans arrive in ascending
    /// `dst_offset` order and never overlap.
    ///
    /// # Errors
    ///
    /// Implementations report failures as [`EcsError::Mirror`].
    fn copy_spans(&mut self, spans: &[CopySpan<'_>]) -> EcsResult<()>;
}

/// Host-memory mirror.
///
/// Useful as a CPU fallback and for checking what a device buffer would
/// contain.
#[derive(Clone, Debug)]
pub struct HostMirror {
    /// Mirror contents.
    bytes: Vec<u8>,
    /// Number of `copy_spans` calls served.
    copy_calls: usize,
    /// Number of spans written.
    spans_written: usize,
}

impl HostMirror {
    /// Creates a zeroed mirror of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            copy_calls: 0,
            spans_written: 0,
        }
    }

    /// Total size in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-sized mirror.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whole mirror contents.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Contents of slot `slot` for slots of `slot_size` bytes.
    ///
    /// Returns `None` if the slot lies outside the mirror.
    #[must_use]
    pub fn slot(&self, slot: usize, slot_size: usize) -> Option<&[u8]> {
        let start = slot.checked_mul(slot_size)?;
        self.bytes.get(start..start.checked_add(slot_size)?)
    }

    /// Number of `copy_spans` calls served so far.
    #[inline]
    #[must_use]
    pub fn copy_calls(&self) -> usize {
        self.copy_calls
    }

    /// Number of spans written so far.
    #[inline]
    #[must_use]
    pub fn spans_written(&self) -> usize {
        self.spans_written
    }
}

impl DeviceMirror for HostMirror {
    fn copy_spans(&mut self, spans: &[CopySpan<'_>]) -> EcsResult<()> {
        // Validate everything first so a bad batch leaves the mirror untouched.
        if let Some(span) = spans.iter().find(|span| span.dst_end() > self.bytes.len()) {
            return Err(EcsError::Mirror(format!(
                "span [{}, {}) past end of {}-byte mirror",
                span.dst_offset,
                span.dst_end(),
                self.bytes.len()
            )));
        }

        for span in spans {
            self.bytes[span.dst_offset..span.dst_end()].copy_from_slice(span.bytes);
        }
        self.copy_calls += 1;
        self.spans_written += spans.len();
        Ok(())
    }
}
