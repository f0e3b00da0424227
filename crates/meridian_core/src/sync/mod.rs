//! # Buffered Device Synchronization
//!
//! Keeps external, device-visible copies of a component array up to date
//! while earlier frames may still be reading them.
//!
//! ## The Problem
//!
//! ```text
//! Frame N:     CPU writes transforms, GPU reads slot 0
//! Frame N+1:   CPU writes transforms, GPU may STILL read slot 0
//!
//! One shared buffer:   overwrite while in use → torn frame
//! Full copy per frame: bandwidth scales with entity count, not change count
//! ```
//!
//! ## The Solution: K Slots, K Dirty Sets
//!
//! ```text
//! mirror: [ slot 0 | slot 1 | ... | slot K-1 ]
//!
//! Frame N:    flush(N mod K)  copy only entities dirty for that slot
//! ```
//!
//! Dirty entities are coalesced into the fewest contiguous copies. No locks:
//! the caller waits on slot `k`'s previous consumer before flushing it.

mod buffered;
mod dirty;
mod frame;
mod mirror;

pub use buffered::{BufferedSync, FlushStats};
pub use dirty::{DirtyIterator, DirtyTracker};
pub use frame::FrameCursor;
pub use mirror::{CopySpan, DeviceMirror, HostMirror};
