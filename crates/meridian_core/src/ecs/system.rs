//! # Systems
//!
//! A system is logic that runs over every entity whose signature satisfies
//! the system's required mask. The [`SystemRegistry`] keeps each system's
//! membership set in step with entity signatures; membership is recomputed
//! synchronously on every signature change, never lazily.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};

use super::entity::{ComponentType, Entity, Signature};
use super::registry::ComponentRegistry;
use crate::error::{EcsError, EcsResult};

/// Membership set of a system. Ordered by entity id.
pub type EntitySet = BTreeSet<Entity>;

/// Upcast helper so boxed systems can be downcast to their concrete type.
///
/// Implemented for every `'static` type; never implement it by hand.
pub trait AsAny: Any {
    /// Upcast to `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Upcast to `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Logic operating over the entities that match a required signature.
///
/// Only [`entities`](System::entities) and
/// [`entities_mut`](System::entities_mut) are required; the hooks default to
/// plain membership bookkeeping.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct CameraSystem {
///     entities: EntitySet,
/// }
///
/// impl System for CameraSystem {
///     fn entities(&self) -> &EntitySet { &self.entities }
///     fn entities_mut(&mut self) -> &mut EntitySet { &mut self.entities }
/// }
/// ```
pub trait System: AsAny {
    /// Current members.
    fn entities(&self) -> &EntitySet;

    /// Current members, mutably. Only the registry should edit membership.
    fn entities_mut(&mut self) -> &mut EntitySet;

    /// Called once when the system is registered.
    ///
    /// # Errors
    ///
    /// Any error aborts the registration.
    fn on_registered(&mut self, _components: &ComponentRegistry) -> EcsResult<()> {
        Ok(())
    }

    /// An entity started matching the system's signature.
    fn register_entity(&mut self, entity: Entity) {
        self.entities_mut().insert(entity);
    }

    /// An entity stopped matching, or was destroyed.
    fn unregister_entity(&mut self, entity: Entity) {
        self.entities_mut().remove(&entity);
    }

    /// `entity` was destroyed. Members are unregistered.
    fn entity_destroyed(&mut self, entity: Entity) {
        if self.entities().contains(&entity) {
            self.unregister_entity(entity);
        }
    }

    /// Swap-with-last moved `entity`'s component of type `component` to a new
    /// dense index.
    fn component_relocated(&mut self, _component: ComponentType, _entity: Entity) {}

    /// `entity`'s component of type `component` was modified in place.
    fn component_modified(&mut self, _component: ComponentType, _entity: Entity) {}
}

/// One registered system.
struct SystemEntry {
    /// Type name for errors and logs.
    name: &'static str,
    /// Required mask. `None` until a signature is set; such systems match
    /// nothing.
    required: Option<Signature>,
    /// The system itself.
    system: Box<dyn System>,
}

impl SystemEntry {
    #[inline]
    fn matches(&self, signature: Signature) -> bool {
        self.required
            .is_some_and(|required| signature.satisfies(required))
    }

    /// Joins or leaves depending on `signature`.
    fn update_membership(&mut self, entity: Entity, signature: Signature) {
        let member = self.system.entities().contains(&entity);
        if self.matches(signature) {
            if !member {
                self.system.register_entity(entity);
            }
        } else if member {
            self.system.unregister_entity(entity);
        }
    }
}

/// Owns one instance per system type and its membership.
#[derive(Default)]
pub struct SystemRegistry {
    /// Position of each system type in `entries`.
    index: HashMap<TypeId, usize>,
    /// Systems in registration order.
    entries: Vec<SystemEntry>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no system is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `system`, keyed by its type.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`] if `S` is already registered, or any
    /// error from the system's [`on_registered`](System::on_registered) hook.
    pub fn register<S: System>(
        &mut self,
        mut system: S,
        components: &ComponentRegistry,
    ) -> EcsResult<&mut S> {
        let name = std::any::type_name::<S>();
        let type_id = TypeId::of::<S>();
        if self.index.contains_key(&type_id) {
            return Err(EcsError::DuplicateSystem(name));
        }
        system.on_registered(components)?;

        let slot = self.entries.len();
        self.index.insert(type_id, slot);
        self.entries.push(SystemEntry {
            name,
            required: None,
            system: Box::new(system),
        });
        tracing::debug!(system = name, "registered system");

        Self::downcast_mut(&mut self.entries[slot])
    }

    /// Sets the mask `S` requires. Membership is not touched here; see
    /// [`refresh`](Self::refresh).
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`] if `S` is not registered.
    pub fn set_signature<S: System>(&mut self, required: Signature) -> EcsResult<()> {
        let entry = self.entry_mut::<S>()?;
        entry.required = Some(required);
        tracing::debug!(
            system = entry.name,
            required = required.bits(),
            "system signature set"
        );
        Ok(())
    }

    /// Required mask of `S`, if one was set.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`] if `S` is not registered.
    pub fn signature<S: System>(&self) -> EcsResult<Option<Signature>> {
        Ok(self.entry::<S>()?.required)
    }

    /// Recomputes `S`'s membership for every given entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`] if `S` is not registered.
    pub fn refresh<S: System>(
        &mut self,
        entities: impl IntoIterator<Item = (Entity, Signature)>,
    ) -> EcsResult<()> {
        let entry = self.entry_mut::<S>()?;
        for (entity, signature) in entities {
            entry.update_membership(entity, signature);
        }
        Ok(())
    }

    /// Updates every system's membership after `entity`'s signature changed.
    pub fn entity_signature_changed(&mut self, entity: Entity, signature: Signature) {
        for entry in &mut self.entries {
            entry.update_membership(entity, signature);
        }
    }

    /// Removes `entity` from every membership set.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for entry in &mut self.entries {
            entry.system.entity_destroyed(entity);
        }
    }

    /// Tells every system that `entity` moved inside `component`'s store.
    pub fn component_relocated(&mut self, component: ComponentType, entity: Entity) {
        for entry in &mut self.entries {
            entry.system.component_relocated(component, entity);
        }
    }

    /// Tells every system that `entity`'s `component` changed.
    pub fn component_modified(&mut self, component: ComponentType, entity: Entity) {
        for entry in &mut self.entries {
            entry.system.component_modified(component, entity);
        }
    }

    /// Registered instance of `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`] if `S` is not registered.
    pub fn get<S: System>(&self) -> EcsResult<&S> {
        // Deref first: `Box<dyn System>` is itself `AsAny`.
        (*self.entry::<S>()?.system)
            .as_any()
            .downcast_ref::<S>()
            .ok_or(EcsError::UnknownSystem(std::any::type_name::<S>()))
    }

    /// Registered instance of `S`, mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`] if `S` is not registered.
    pub fn get_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        Self::downcast_mut(self.entry_mut::<S>()?)
    }

    fn entry<S: System>(&self) -> EcsResult<&SystemEntry> {
        self.index
            .get(&TypeId::of::<S>())
            .map(|&slot| &self.entries[slot])
            .ok_or(EcsError::UnknownSystem(std::any::type_name::<S>()))
    }

    fn entry_mut<S: System>(&mut self) -> EcsResult<&mut SystemEntry> {
        match self.index.get(&TypeId::of::<S>()) {
            Some(&slot) => Ok(&mut self.entries[slot]),
            None => Err(EcsError::UnknownSystem(std::any::type_name::<S>())),
        }
    }

    fn downcast_mut<S: System>(entry: &mut SystemEntry) -> EcsResult<&mut S> {
        (*entry.system)
            .as_any_mut()
            .downcast_mut::<S>()
            .ok_or(EcsError::UnknownSystem(std::any::type_name::<S>()))
    }
}
