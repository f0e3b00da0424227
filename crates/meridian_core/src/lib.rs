//! # MERIDIAN Core
//!
//! Entity Component System with buffered device synchronization:
//! - Dense, gap-free component arrays that can be handed to a device as-is
//! - Signature-driven system membership
//! - `K` frames in flight without locks
//!
//! ## Architecture Rules
//!
//! 1. **Fixed capacity** - Entity ids and store maps are sized at creation
//! 2. **Data-oriented design** - One contiguous array per component type
//! 3. **Copy what changed** - Dirty entities become the fewest contiguous copies
//!
//! ## Example
//!
//! ```rust,ignore
//! use meridian_core::{BufferedSync, Coordinator, EcsConfig, HostMirror, Signature};
//!
//! let config = EcsConfig::load("meridian.toml")?;
//! let mut coordinator = Coordinator::new(&config);
//! let transform = coordinator.register_component::<DeviceTransform>()?;
//!
//! let sync = BufferedSync::<DeviceTransform>::for_entities(config.frames_in_flight, config.max_entities);
//! let mut mirror = HostMirror::new(sync.total_size());
//! coordinator.register_system_with(sync)?;
//! coordinator.set_system_signature::<BufferedSync<DeviceTransform>>(Signature::of(&[transform]))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod sync;

pub use config::EcsConfig;
pub use ecs::{
    Component, ComponentRegistry, ComponentStore, ComponentType, Coordinator, Entity,
    EntityAllocator, EntitySet, Signature, System, SystemRegistry, MAX_COMPONENTS,
};
pub use error::{EcsError, EcsResult};
pub use sync::{BufferedSync, CopySpan, DeviceMirror, FlushStats, FrameCursor, HostMirror};
