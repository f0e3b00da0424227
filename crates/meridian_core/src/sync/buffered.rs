//! # Buffered Sync
//!
//! Keeps `K` slots of a device mirror eventually consistent with one
//! component type's dense array.
//!
//! ## The Problem
//!
//! With `K` frames in flight, slot `k` of the mirror may still be read by
//! work issued `K - 1` frames ago. A single dirty set cannot work: clearing it
//! after flushing slot 0 would hide the change from slots 1..K.
//!
//! ## The Solution
//!
//! Every slot owns its own dirty set. A mutation marks all `K` sets; flushing
//! slot `k` only clears set `k`. After `K` flushes every slot has seen the
//! change exactly once.
//!
//! ```text
//! mark(e7)          flush(0)          flush(1)          flush(2)
//! slot 0: {e7}  ->  slot 0: {}    ->  slot 0: {}    ->  slot 0: {}
//! slot 1: {e7}      slot 1: {e7}      slot 1: {}        slot 1: {}
//! slot 2: {e7}      slot 2: {e7}      slot 2: {e7}      slot 2: {}
//! ```
//!
//! Dirty sets are keyed by entity id, not dense index, so a swap-with-last
//! removal never leaves a set pointing at the wrong component. Indices are
//! resolved when the slot is flushed.

use std::marker::PhantomData;
use std::mem::size_of;

use super::dirty::DirtyTracker;
use super::mirror::{CopySpan, DeviceMirror};
use crate::ecs::component::Component;
use crate::ecs::coordinator::Coordinator;
use crate::ecs::entity::{ComponentType, Entity};
use crate::ecs::registry::ComponentRegistry;
use crate::ecs::storage::ComponentStore;
use crate::ecs::system::{EntitySet, System};
use crate::error::{EcsError, EcsResult};

/// Result of one slot flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Contiguous spans handed to the mirror.
    pub spans: usize,
    /// Components copied.
    pub entities: usize,
    /// Bytes copied.
    pub bytes: usize,
    /// Dirty entities dropped because they no longer hold the component.
    pub skipped: usize,
}

impl FlushStats {
    /// True if the flush issued no copy.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans == 0
    }

    fn accumulate(&mut self, other: Self) {
        self.spans += other.spans;
        self.entities += other.entities;
        self.bytes += other.bytes;
        self.skipped += other.skipped;
    }
}

/// Dirty state of one mirror slot.
#[derive(Clone, Debug, Default)]
struct SlotState {
    /// Entity ids changed since this slot was last flushed.
    dirty: DirtyTracker,
    /// Raised by every mark, lowered by a successful flush.
    needs_flush: bool,
}

/// System that mirrors `T`'s dense array into `K` device slots.
///
/// Register it with [`Coordinator::register_system_with`], give it a
/// signature containing `T`, then call
/// [`Coordinator::flush_buffered`] once per frame for the slot about to be
/// reused.
///
/// # Example
///
/// ```rust,ignore
/// let mut coordinator = Coordinator::new(&config);
/// let transform = coordinator.register_component::<DeviceTransform>()?;
/// coordinator.register_system_with(BufferedSync::<DeviceTransform>::for_entities(
///     config.frames_in_flight,
///     config.max_entities,
/// ))?;
/// coordinator.set_system_signature::<BufferedSync<DeviceTransform>>(Signature::of(&[transform]))?;
///
/// // Each frame
/// let slot = cursor.current_slot();
/// coordinator.flush_buffered::<DeviceTransform>(slot, &mut mirror)?;
/// cursor.advance();
/// ```
pub struct BufferedSync<T: Component> {
    /// Members: entities whose signature satisfies the system's mask.
    entities: EntitySet,
    /// Tag of `T`, known once registered.
    component: Option<ComponentType>,
    /// One dirty set per frame in flight.
    slots: Vec<SlotState>,
    /// Bytes per slot.
    slot_capacity: usize,
    /// Entity ids at or past this are never tracked.
    entity_limit: usize,
    /// Dense indices resolved during a flush.
    scratch: Vec<usize>,
    _marker: PhantomData<T>,
}

impl<T: Component> BufferedSync<T> {
    /// Creates a sync for `frames_in_flight` slots of `slot_capacity` bytes.
    ///
    /// Until registration, only entity ids that fit one slot are tracked.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is zero.
    #[must_use]
    pub fn new(frames_in_flight: usize, slot_capacity: usize) -> Self {
        assert!(frames_in_flight > 0, "at least one frame in flight is required");

        let mut sync = Self {
            entities: EntitySet::new(),
            component: None,
            slots: vec![SlotState::default(); frames_in_flight],
            slot_capacity,
            entity_limit: 0,
            scratch: Vec::new(),
            _marker: PhantomData,
        };
        sync.set_entity_limit(slot_capacity / size_of::<T>().max(1));
        sync
    }

    /// Creates a sync whose slots hold `max_entities` components each.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is zero.
    #[must_use]
    pub fn for_entities(frames_in_flight: usize, max_entities: usize) -> Self {
        let mut sync = Self::new(frames_in_flight, max_entities * size_of::<T>());
        sync.set_entity_limit(max_entities);
        sync
    }

    /// Entity ids below this are tracked; marks for larger ids are ignored.
    #[inline]
    #[must_use]
    pub fn entity_limit(&self) -> usize {
        self.entity_limit
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Bytes per slot.
    #[inline]
    #[must_use]
    pub fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }

    /// Bytes the mirror must provide for all slots.
    #[inline]
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.slot_capacity * self.slots.len()
    }

    /// Byte offset of slot `slot` inside the mirror.
    #[inline]
    #[must_use]
    pub fn slot_offset(&self, slot: usize) -> usize {
        self.slot_capacity * slot
    }

    /// True if slot `slot` has anything to copy.
    #[inline]
    #[must_use]
    pub fn needs_flush(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|state| state.needs_flush)
    }

    /// Number of dirty entities waiting for slot `slot`.
    #[inline]
    #[must_use]
    pub fn pending(&self, slot: usize) -> usize {
        self.slots
            .get(slot)
            .map_or(0, |state| state.dirty.dirty_count())
    }

    /// Checks whether `entity` is waiting for slot `slot`.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self, slot: usize, entity: Entity) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|state| state.dirty.is_dirty(entity.index()))
    }

    /// Marks `entity` dirty in every slot.
    ///
    /// Returns `false`, and marks nothing, for ids at or past
    /// [`entity_limit`](Self::entity_limit).
    pub fn mark_dirty(&mut self, entity: Entity) -> bool {
        if entity.index() >= self.entity_limit {
            tracing::trace!(
                entity = entity.id(),
                limit = self.entity_limit,
                "ignoring dirty mark past entity limit"
            );
            return false;
        }
        for state in &mut self.slots {
            state.dirty.mark(entity.index());
            state.needs_flush = true;
        }
        true
    }

    /// Forces every member to be copied on the next flush of `slot`.
    ///
    /// Besides raising the slot's flag, every current member is marked dirty
    /// again, so the slot is rewritten in full even if it lost its contents.
    ///
    /// # Errors
    ///
    /// [`EcsError::SlotOutOfRange`] if `slot >= frames_in_flight()`.
    pub fn request_update(&mut self, slot: usize) -> EcsResult<()> {
        let slots = self.slots.len();
        let state = self
            .slots
            .get_mut(slot)
            .ok_or(EcsError::SlotOutOfRange { slot, slots })?;
        for entity in &self.entities {
            state.dirty.mark(entity.index());
        }
        state.needs_flush = true;
        Ok(())
    }

    /// Forces every member to be copied on the next flush of every slot.
    ///
    /// As [`request_update`](Self::request_update), for all slots at once.
    pub fn request_all_update(&mut self) {
        for state in &mut self.slots {
            for entity in &self.entities {
                state.dirty.mark(entity.index());
            }
            state.needs_flush = true;
        }
    }

    /// Copies every dirty component of slot `slot` into `mirror`.
    ///
    /// Dirty entities are resolved to their current dense index, sorted, and
    /// merged into the fewest contiguous spans, which reach the mirror in one
    /// [`copy_spans`](DeviceMirror::copy_spans) call. The slot is only
    /// marked clean once the mirror accepted the copy.
    ///
    /// # Errors
    ///
    /// [`EcsError::SlotOutOfRange`] for a bad slot, [`EcsError::SlotOverflow`]
    /// if the dense array outgrew the slot, or whatever the mirror returns.
    pub fn flush<M: DeviceMirror + ?Sized>(
        &mut self,
        slot: usize,
        store: &ComponentStore<T>,
        mirror: &mut M,
    ) -> EcsResult<FlushStats> {
        let slots = self.slots.len();
        let Some(state) = self.slots.get(slot) else {
            return Err(EcsError::SlotOutOfRange { slot, slots });
        };
        if !state.needs_flush {
            return Ok(FlushStats::default());
        }

        let mut stats = FlushStats::default();
        self.scratch.clear();
        for id in state.dirty.iter_dirty() {
            #[allow(clippy::cast_possible_truncation)]
            let entity = Entity::from_raw(id as u32);
            match store.index(entity) {
                Ok(index) => self.scratch.push(index),
                Err(_) => {
                    tracing::trace!(entity = id, slot, "dropping stale dirty entry");
                    stats.skipped += 1;
                }
            }
        }
        self.scratch.sort_unstable();

        let size = size_of::<T>();
        let base = self.slot_offset(slot);
        let bytes = store.as_bytes();
        let mut spans: Vec<CopySpan<'_>> = Vec::new();
        let mut run: Option<(usize, usize)> = None;
        for &index in &self.scratch {
            run = match run {
                Some((start, end)) if end == index => Some((start, index + 1)),
                Some((start, end)) => {
                    spans.push(Self::span(bytes, base, size, start, end));
                    Some((index, index + 1))
                }
                None => Some((index, index + 1)),
            };
        }
        if let Some((start, end)) = run {
            spans.push(Self::span(bytes, base, size, start, end));
        }

        if let Some(last) = spans.last() {
            let required = last.dst_end() - base;
            if required > self.slot_capacity {
                return Err(EcsError::SlotOverflow {
                    required,
                    capacity: self.slot_capacity,
                });
            }
            mirror.copy_spans(&spans)?;
        }

        stats.spans = spans.len();
        stats.entities = self.scratch.len();
        stats.bytes = spans.iter().map(|span| span.size()).sum();

        let state = &mut self.slots[slot];
        state.dirty.clear();
        state.needs_flush = false;

        tracing::trace!(
            slot,
            spans = stats.spans,
            entities = stats.entities,
            bytes = stats.bytes,
            skipped = stats.skipped,
            "flushed mirror slot"
        );
        Ok(stats)
    }

    /// Flushes every slot in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing slot; earlier slots stay flushed.
    pub fn flush_all<M: DeviceMirror + ?Sized>(
        &mut self,
        store: &ComponentStore<T>,
        mirror: &mut M,
    ) -> EcsResult<FlushStats> {
        let mut total = FlushStats::default();
        for slot in 0..self.slots.len() {
            total.accumulate(self.flush(slot, store, mirror)?);
        }
        Ok(total)
    }

    #[inline]
    fn span(bytes: &[u8], base: usize, size: usize, start: usize, end: usize) -> CopySpan<'_> {
        CopySpan {
            dst_offset: base + start * size,
            bytes: &bytes[start * size..end * size],
        }
    }

    fn set_entity_limit(&mut self, limit: usize) {
        self.entity_limit = limit;
        for state in &mut self.slots {
            state.dirty.reserve(limit);
        }
    }

    fn purge(&mut self, entity: Entity) {
        for state in &mut self.slots {
            state.dirty.unmark(entity.index());
        }
    }

    fn tracks(&self, component: ComponentType) -> bool {
        self.component == Some(component)
    }
}

impl<T: Component> System for BufferedSync<T> {
    fn entities(&self) -> &EntitySet {
        &self.entities
    }

    fn entities_mut(&mut self) -> &mut EntitySet {
        &mut self.entities
    }

    fn on_registered(&mut self, components: &ComponentRegistry) -> EcsResult<()> {
        self.component = Some(components.component_type::<T>()?);
        self.set_entity_limit(components.capacity());
        Ok(())
    }

    fn register_entity(&mut self, entity: Entity) {
        self.entities.insert(entity);
        self.mark_dirty(entity);
    }

    fn unregister_entity(&mut self, entity: Entity) {
        self.entities.remove(&entity);
        self.purge(entity);
    }

    fn entity_destroyed(&mut self, entity: Entity) {
        self.entities.remove(&entity);
        self.purge(entity);
    }

    fn component_relocated(&mut self, component: ComponentType, entity: Entity) {
        if self.tracks(component) {
            self.mark_dirty(entity);
        }
    }

    fn component_modified(&mut self, component: ComponentType, entity: Entity) {
        if self.tracks(component) {
            self.mark_dirty(entity);
        }
    }
}

// =============================================================================
// Coordinator glue
// =============================================================================

impl Coordinator {
    /// Marks `entity`'s `T` dirty in every slot of `BufferedSync<T>`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotAlive`], or [`EcsError::UnknownSystem`] if no
    /// `BufferedSync<T>` is registered.
    pub fn mark_dirty<T: Component>(&mut self, entity: Entity) -> EcsResult<()> {
        self.entities.check_alive(entity)?;
        self.systems.get_mut::<BufferedSync<T>>()?.mark_dirty(entity);
        Ok(())
    }

    /// Flushes slot `slot` of `BufferedSync<T>` into `mirror`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`], [`EcsError::UnregisteredComponent`], or
    /// any error from [`BufferedSync::flush`].
    pub fn flush_buffered<T: Component>(
        &mut self,
        slot: usize,
        mirror: &mut (impl DeviceMirror + ?Sized),
    ) -> EcsResult<FlushStats> {
        let store = self.components.store::<T>()?;
        self.systems
            .get_mut::<BufferedSync<T>>()?
            .flush(slot, store, mirror)
    }

    /// Flushes every slot of `BufferedSync<T>` into `mirror`.
    ///
    /// # Errors
    ///
    /// As [`flush_buffered`](Self::flush_buffered).
    pub fn flush_all_buffered<T: Component>(
        &mut self,
        mirror: &mut (impl DeviceMirror + ?Sized),
    ) -> EcsResult<FlushStats> {
        let store = self.components.store::<T>()?;
        self.systems.get_mut::<BufferedSync<T>>()?.flush_all(store, mirror)
    }
}
