//! # Component Storage
//!
//! Dense, hole-free component arrays with O(1) insert, lookup and removal.
//!
//! The storage uses a dense array strategy:
//! - Components of one type sit back to back, in no particular order
//! - `entity_to_index` maps an entity id to its dense slot (flat array, O(1))
//! - `index_to_entity` runs parallel to the dense array
//! - Removal moves the last element into the hole (swap-with-last)
//!
//! ```text
//! remove(B):   dense [A, B, C, D]  ->  [A, D, C]
//!                        ^      |            ^
//!                        +------+            D now reports index 1
//! ```
//!
//! Dense indices (and byte offsets derived from them) are a view that is only
//! valid until the next removal.

use std::any::Any;

use super::component::Component;
use super::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// Marker for an entity id with no slot in this store.
const VACANT: u32 = u32::MAX;

/// Dense storage for a single component type.
///
/// Memory for the maps is reserved for the full entity capacity up front;
/// the dense array reserves it too and never reallocates.
///
/// # Example
///
/// ```rust,ignore
/// let mut store: ComponentStore<DeviceTransform> = ComponentStore::new(1024);
/// store.insert(entity, transform)?;
/// let offset = store.offset(entity)?; // byte offset inside `as_bytes()`
/// ```
pub struct ComponentStore<T: Component> {
    /// The dense array of components.
    dense: Vec<T>,
    /// Owner of each dense slot.
    index_to_entity: Vec<Entity>,
    /// Dense slot of each entity id, or `VACANT`.
    entity_to_index: Box<[u32]>,
}

impl<T: Component> ComponentStore<T> {
    /// Creates an empty store for entity ids in `[0, capacity)`.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            dense: Vec::with_capacity(capacity),
            index_to_entity: Vec::with_capacity(capacity),
            entity_to_index: vec![VACANT; capacity].into_boxed_slice(),
        }
    }

    /// Returns the entity capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entity_to_index.len()
    }

    /// Number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// True if no component is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Checks whether `entity` has a component here.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Appends a component for `entity` at dense index `len()`.
    ///
    /// Returns the new dense index.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] for ids past the capacity,
    /// [`EcsError::DuplicateComponent`] if the entity already has one.
    pub fn insert(&mut self, entity: Entity, value: T) -> EcsResult<usize> {
        let capacity = self.capacity();
        let Some(mapped) = self.entity_to_index.get_mut(entity.index()) else {
            return Err(EcsError::OutOfRange {
                entity: entity.id(),
                capacity,
            });
        };
        if *mapped != VACANT {
            return Err(EcsError::DuplicateComponent {
                entity: entity.id(),
                component: T::name(),
            });
        }

        let index = self.dense.len();
        // len < capacity < u32::MAX, so the cast is lossless.
        #[allow(clippy::cast_possible_truncation)]
        {
            *mapped = index as u32;
        }
        self.dense.push(value);
        self.index_to_entity.push(entity);
        Ok(index)
    }

    /// Removes `entity`'s component by moving the last element into its slot.
    ///
    /// Returns the entity whose component was relocated, or `None` if the
    /// removed component was already last.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the entity has no component here.
    pub fn remove(&mut self, entity: Entity) -> EcsResult<Option<Entity>> {
        let removed = self.slot(entity).ok_or_else(|| self.missing(entity))?;
        let last = self.dense.len() - 1;

        self.dense.swap_remove(removed);
        self.index_to_entity.swap_remove(removed);
        self.entity_to_index[entity.index()] = VACANT;

        if removed == last {
            return Ok(None);
        }

        let moved = self.index_to_entity[removed];
        #[allow(clippy::cast_possible_truncation)]
        {
            self.entity_to_index[moved.index()] = removed as u32;
        }
        Ok(Some(moved))
    }

    /// Removes `entity`'s component if it has one.
    ///
    /// Returns the relocated entity, as [`remove`](Self::remove) does.
    pub fn entity_destroyed(&mut self, entity: Entity) -> Option<Entity> {
        if self.contains(entity) {
            self.remove(entity).ok().flatten()
        } else {
            None
        }
    }

    /// Gets `entity`'s component.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the entity has no component here.
    #[inline]
    pub fn get(&self, entity: Entity) -> EcsResult<&T> {
        let index = self.slot(entity).ok_or_else(|| self.missing(entity))?;
        Ok(&self.dense[index])
    }

    /// Gets `entity`'s component mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the entity has no component here.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> EcsResult<&mut T> {
        let index = self.slot(entity).ok_or_else(|| self.missing(entity))?;
        Ok(&mut self.dense[index])
    }

    /// Gets the component at a dense index.
    ///
    /// # Errors
    ///
    /// [`EcsError::IndexOutOfRange`] if `index >= len()`.
    #[inline]
    pub fn get_by_index(&self, index: usize) -> EcsResult<&T> {
        self.dense.get(index).ok_or(EcsError::IndexOutOfRange {
            index,
            len: self.dense.len(),
            component: T::name(),
        })
    }

    /// Gets the component at a dense index mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::IndexOutOfRange`] if `index >= len()`.
    #[inline]
    pub fn get_by_index_mut(&mut self, index: usize) -> EcsResult<&mut T> {
        let len = self.dense.len();
        self.dense.get_mut(index).ok_or(EcsError::IndexOutOfRange {
            index,
            len,
            component: T::name(),
        })
    }

    /// Returns the owner of a dense slot.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, index: usize) -> Option<Entity> {
        self.index_to_entity.get(index).copied()
    }

    /// Dense index of `entity`'s component.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the entity has no component here.
    #[inline]
    pub fn index(&self, entity: Entity) -> EcsResult<usize> {
        self.slot(entity).ok_or_else(|| self.missing(entity))
    }

    /// Byte offset of `entity`'s component inside [`as_bytes`](Self::as_bytes).
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the entity has no component here.
    #[inline]
    pub fn offset(&self, entity: Entity) -> EcsResult<usize> {
        Ok(self.index(entity)? * std::mem::size_of::<T>())
    }

    /// The dense array.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// The dense array as raw bytes, for bulk export.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.dense)
    }

    /// Raw bytes of a single entity's component.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the entity has no component here.
    #[inline]
    pub fn entity_bytes(&self, entity: Entity) -> EcsResult<&[u8]> {
        self.get(entity).map(bytemuck::bytes_of)
    }

    /// Total occupied byte extent: `len() * size_of::<T>()`.
    #[inline]
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.dense.len() * std::mem::size_of::<T>()
    }

    /// Iterates over `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.index_to_entity.iter().copied().zip(self.dense.iter())
    }

    #[inline]
    fn slot(&self, entity: Entity) -> Option<usize> {
        match self.entity_to_index.get(entity.index()) {
            Some(&index) if index != VACANT => Some(index as usize),
            _ => None,
        }
    }

    #[cold]
    fn missing(&self, entity: Entity) -> EcsError {
        EcsError::MissingComponent {
            entity: entity.id(),
            component: T::name(),
        }
    }
}

/// Type-erased view of a [`ComponentStore`], so stores of every type can sit
/// in one registry and receive entity lifecycle events.
pub trait ErasedStore: Any {
    /// Drops `entity`'s component, if any. Returns the relocated entity.
    fn entity_destroyed(&mut self, entity: Entity) -> Option<Entity>;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// True if no component is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upcast for downcasting to the concrete store.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete store.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn entity_destroyed(&mut self, entity: Entity) -> Option<Entity> {
        ComponentStore::entity_destroyed(self, entity)
    }

    fn len(&self) -> usize {
        ComponentStore::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
