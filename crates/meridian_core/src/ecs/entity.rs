//! # Entity Management
//!
//! Entities are plain indices in `[0, capacity)`. All per-entity state (the
//! component signature and a liveness flag) lives in flat arrays owned by the
//! [`EntityAllocator`], sized once at creation.

use std::collections::VecDeque;

use crate::error::{EcsError, EcsResult};

/// Width of a [`Signature`], i.e. the maximum number of component types.
pub const MAX_COMPONENTS: usize = 64;

/// Opaque entity handle.
///
/// Carries no data. Ids are recycled after destruction, so a handle is only
/// meaningful while the entity is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Null/invalid entity handle.
    pub const INVALID: Self = Self(u32::MAX);

    /// Creates a handle from a raw id.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the raw id as an array index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is the invalid handle.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Tag of a registered component type, assigned in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentType(u8);

impl ComponentType {
    /// Creates a tag.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `tag` does not fit into a [`Signature`].
    #[inline]
    #[must_use]
    pub const fn new(tag: u8) -> Self {
        debug_assert!((tag as usize) < MAX_COMPONENTS);
        Self(tag)
    }

    /// Returns the raw tag (0-63).
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        self.0
    }
}

/// Bitset of component types attached to an entity, or required by a system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(u64);

impl Signature {
    /// Signature with no bits set.
    pub const EMPTY: Self = Self(0);

    /// Builds a signature from a list of component types.
    #[must_use]
    pub fn of(types: &[ComponentType]) -> Self {
        types.iter().fold(Self::EMPTY, |sig, &ty| sig.with(ty))
    }

    /// Returns a copy with `ty` set.
    #[inline]
    #[must_use]
    pub const fn with(self, ty: ComponentType) -> Self {
        Self(self.0 | (1 << ty.0))
    }

    /// Sets the bit for `ty`.
    #[inline]
    pub fn insert(&mut self, ty: ComponentType) {
        self.0 |= 1 << ty.0;
    }

    /// Clears the bit for `ty`.
    #[inline]
    pub fn remove(&mut self, ty: ComponentType) {
        self.0 &= !(1 << ty.0);
    }

    /// Checks the bit for `ty`.
    #[inline]
    #[must_use]
    pub const fn contains(self, ty: ComponentType) -> bool {
        (self.0 & (1 << ty.0)) != 0
    }

    /// True if every bit of `required` is also set here.
    #[inline]
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        (self.0 & required.0) == required.0
    }

    /// True if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }
}

/// Issues and recycles entity ids, and owns their signatures.
///
/// Ids come from a FIFO free queue, so a destroyed id goes to the back of the
/// line instead of being handed out again immediately.
pub struct EntityAllocator {
    /// Per-entity signature, indexed by id.
    signatures: Box<[Signature]>,
    /// Per-entity liveness, indexed by id.
    alive: Box<[bool]>,
    /// Ids available for creation.
    available: VecDeque<Entity>,
    /// Number of currently alive entities.
    living_count: usize,
}

impl EntityAllocator {
    /// Creates an allocator with a fixed capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or does not fit an entity id.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity < u32::MAX as usize,
            "Capacity must leave room for Entity::INVALID"
        );

        #[allow(clippy::cast_possible_truncation)]
        let available = (0..capacity as u32).map(Entity).collect();

        Self {
            signatures: vec![Signature::EMPTY; capacity].into_boxed_slice(),
            alive: vec![false; capacity].into_boxed_slice(),
            available,
            living_count: 0,
        }
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.signatures.len()
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn living_count(&self) -> usize {
        self.living_count
    }

    /// Takes an id from the free queue.
    ///
    /// # Errors
    ///
    /// [`EcsError::CapacityExceeded`] if every id is alive.
    pub fn create(&mut self) -> EcsResult<Entity> {
        let Some(entity) = self.available.pop_front() else {
            return Err(EcsError::CapacityExceeded {
                capacity: self.capacity(),
            });
        };

        self.alive[entity.index()] = true;
        self.living_count += 1;
        Ok(entity)
    }

    /// Resets the entity's signature and returns its id to the free queue.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] for ids past the capacity,
    /// [`EcsError::EntityNotAlive`] for ids not currently alive.
    pub fn destroy(&mut self, entity: Entity) -> EcsResult<()> {
        self.check_alive(entity)?;

        let idx = entity.index();
        self.signatures[idx] = Signature::EMPTY;
        self.alive[idx] = false;
        self.available.push_back(entity);
        self.living_count -= 1;
        Ok(())
    }

    /// Checks if an entity is alive. Out-of-range ids are never alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Fails unless `entity` is in range and alive.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] or [`EcsError::EntityNotAlive`].
    pub fn check_alive(&self, entity: Entity) -> EcsResult<()> {
        self.check_range(entity)?;
        if self.alive[entity.index()] {
            Ok(())
        } else {
            Err(EcsError::EntityNotAlive(entity.id()))
        }
    }

    /// Overwrites an entity's signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] for ids past the capacity.
    #[inline]
    pub fn set_signature(&mut self, entity: Entity, signature: Signature) -> EcsResult<()> {
        self.check_range(entity)?;
        self.signatures[entity.index()] = signature;
        Ok(())
    }

    /// Returns an entity's signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] for ids past the capacity.
    #[inline]
    pub fn signature(&self, entity: Entity) -> EcsResult<Signature> {
        self.check_range(entity)?;
        Ok(self.signatures[entity.index()])
    }

    /// Iterates over all alive entities with their signatures, in id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = (Entity, Signature)> + '_ {
        self.alive
            .iter()
            .zip(self.signatures.iter())
            .enumerate()
            .filter(|(_, (alive, _))| **alive)
            .map(|(idx, (_, sig))| {
                #[allow(clippy::cast_possible_truncation)]
                let entity = Entity(idx as u32);
                (entity, *sig)
            })
    }

    #[inline]
    fn check_range(&self, entity: Entity) -> EcsResult<()> {
        if entity.index() < self.capacity() {
            Ok(())
        } else {
            Err(EcsError::OutOfRange {
                entity: entity.id(),
                capacity: self.capacity(),
            })
        }
    }
}
