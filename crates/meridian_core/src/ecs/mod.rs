//! # Entity Component System
//!
//! A fixed-capacity ECS built around dense component arrays.
//!
//! ## Design Philosophy
//!
//! - Entity ids are plain indices recycled through a FIFO queue
//! - Each component type lives in one dense, gap-free array
//! - Systems track membership by signature, updated on every mutation
//! - Errors are returned, never panicked

pub(crate) mod component;
pub(crate) mod coordinator;
pub(crate) mod entity;
pub(crate) mod registry;
pub(crate) mod storage;
pub(crate) mod system;

pub use component::Component;
pub use coordinator::Coordinator;
pub use entity::{ComponentType, Entity, EntityAllocator, Signature, MAX_COMPONENTS};
pub use registry::ComponentRegistry;
pub use storage::{ComponentStore, ErasedStore};
pub use system::{AsAny, EntitySet, System, SystemRegistry};
