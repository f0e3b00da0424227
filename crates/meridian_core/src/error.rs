//! # Core Error Types
//!
//! Every failure in this crate is a broken caller contract: the core does no
//! I/O on the hot path, so nothing here is transient or worth retrying.

use thiserror::Error;

/// Errors reported by the entity/component/system registry and the
/// buffered sync layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Every entity id is currently live.
    #[error("entity capacity exceeded: {capacity} entities already alive")]
    CapacityExceeded {
        /// Fixed capacity of the allocator.
        capacity: usize,
    },

    /// Entity id lies outside `[0, capacity)`.
    #[error("entity {entity} out of range (capacity {capacity})")]
    OutOfRange {
        /// Raw entity id.
        entity: u32,
        /// Fixed capacity of the allocator.
        capacity: usize,
    },

    /// Entity id is in range but not currently alive.
    #[error("entity {0} is not alive")]
    EntityNotAlive(u32),

    /// Entity already owns a component of this type.
    #[error("entity {entity} already has component `{component}`")]
    DuplicateComponent {
        /// Raw entity id.
        entity: u32,
        /// Component type name.
        component: &'static str,
    },

    /// Entity does not own a component of this type.
    #[error("entity {entity} has no component `{component}`")]
    MissingComponent {
        /// Raw entity id.
        entity: u32,
        /// Component type name.
        component: &'static str,
    },

    /// Dense index past the end of a component array.
    #[error("dense index {index} out of range for `{component}` (len {len})")]
    IndexOutOfRange {
        /// Requested dense index.
        index: usize,
        /// Number of occupied slots.
        len: usize,
        /// Component type name.
        component: &'static str,
    },

    /// Component type registered twice.
    #[error("component `{0}` registered more than once")]
    DuplicateRegistration(&'static str),

    /// Component type used before registration.
    #[error("component `{0}` is not registered")]
    UnregisteredComponent(&'static str),

    /// No signature bits left for another component type.
    #[error("cannot register `{component}`: all {max} component types in use")]
    TooManyComponentTypes {
        /// Component type name.
        component: &'static str,
        /// Signature width.
        max: usize,
    },

    /// System type registered twice.
    #[error("system `{0}` registered more than once")]
    DuplicateSystem(&'static str),

    /// System type used before registration.
    #[error("system `{0}` is not registered")]
    UnknownSystem(&'static str),

    /// Mirror slot index past the number of frames in flight.
    #[error("mirror slot {slot} out of range ({slots} frames in flight)")]
    SlotOutOfRange {
        /// Requested slot.
        slot: usize,
        /// Number of slots.
        slots: usize,
    },

    /// Dense array no longer fits into one mirror slot.
    #[error("copy of {required} bytes exceeds mirror slot capacity of {capacity} bytes")]
    SlotOverflow {
        /// Bytes the flush would need inside the slot.
        required: usize,
        /// Bytes available per slot.
        capacity: usize,
    },

    /// The device mirror rejected a copy request.
    #[error("device mirror rejected copy: {0}")]
    Mirror(String),

    /// Configuration could not be read or is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations.
pub type EcsResult<T> = Result<T, EcsError>;
