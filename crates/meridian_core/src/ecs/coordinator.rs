//! # Coordinator
//!
//! The facade over entities, component stores and systems. Systems and the
//! sync layer talk to the Coordinator and nothing else.
//!
//! The Coordinator is an ordinary owned value: create one, pass it by
//! reference. There is no global instance.

use super::component::Component;
use super::entity::{ComponentType, Entity, EntityAllocator, Signature};
use super::registry::ComponentRegistry;
use super::storage::ComponentStore;
use super::system::{System, SystemRegistry};
use crate::config::EcsConfig;
use crate::error::EcsResult;

/// Entity/component/system registry.
///
/// Capacity is fixed at creation.
///
/// # Mutation order
///
/// Adding or removing a component always runs in this order, so a system
/// never observes a half-updated entity:
///
/// 1. component store insert/remove
/// 2. signature bit update
/// 3. membership recompute for every system
///
/// # Example
///
/// ```rust,ignore
/// let mut coordinator = Coordinator::new(&EcsConfig::default());
/// coordinator.register_component::<DeviceTransform>()?;
///
/// let entity = coordinator.create_entity()?;
/// coordinator.add_component(entity, DeviceTransform::IDENTITY)?;
/// ```
pub struct Coordinator {
    /// Entity ids and signatures.
    pub(crate) entities: EntityAllocator,
    /// Component type tags and dense stores.
    pub(crate) components: ComponentRegistry,
    /// Systems and their membership.
    pub(crate) systems: SystemRegistry,
}

impl Coordinator {
    /// Creates a coordinator sized from `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_entities` is zero or does not fit an entity id;
    /// run [`EcsConfig::validate`] first to get an error instead.
    #[must_use]
    pub fn new(config: &EcsConfig) -> Self {
        Self::with_capacity(config.max_entities)
    }

    /// Creates a coordinator for at most `max_entities` live entities.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or does not fit an entity id.
    #[must_use]
    pub fn with_capacity(max_entities: usize) -> Self {
        Self {
            entities: EntityAllocator::new(max_entities),
            components: ComponentRegistry::new(max_entities),
            systems: SystemRegistry::new(),
        }
    }

    /// Maximum number of live entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn living_count(&self) -> usize {
        self.entities.living_count()
    }

    /// Read access to the component registry.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with an empty signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::CapacityExceeded`](crate::EcsError::CapacityExceeded) when
    /// every id is alive.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        self.entities.create()
    }

    /// Destroys an entity and every component it owns.
    ///
    /// Stores that moved another entity into the freed slot report it to the
    /// systems before the destroyed entity leaves every membership set.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange) or
    /// [`EcsError::EntityNotAlive`](crate::EcsError::EntityNotAlive).
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.entities.destroy(entity)?;

        let systems = &mut self.systems;
        self.components
            .entity_destroyed(entity, |component, moved| {
                systems.component_relocated(component, moved);
            });
        self.systems.entity_destroyed(entity);
        Ok(())
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Signature of an entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange).
    #[inline]
    pub fn signature(&self, entity: Entity) -> EcsResult<Signature> {
        self.entities.signature(entity)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers a component type and returns its tag.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateRegistration`](crate::EcsError::DuplicateRegistration)
    /// or [`EcsError::TooManyComponentTypes`](crate::EcsError::TooManyComponentTypes).
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentType> {
        self.components.register::<T>()
    }

    /// Tag of a registered component type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent).
    #[inline]
    pub fn component_type<T: Component>(&self) -> EcsResult<ComponentType> {
        self.components.component_type::<T>()
    }

    /// Attaches a component to a live entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotAlive`](crate::EcsError::EntityNotAlive),
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::DuplicateComponent`](crate::EcsError::DuplicateComponent).
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.entities.check_alive(entity)?;
        let component = self.components.component_type::<T>()?;

        self.components.store_mut::<T>()?.insert(entity, value)?;

        let mut signature = self.entities.signature(entity)?;
        signature.insert(component);
        self.entities.set_signature(entity, signature)?;

        self.systems.entity_signature_changed(entity, signature);
        Ok(())
    }

    /// Detaches a component from a live entity.
    ///
    /// Any cached dense index or offset of `T` is stale afterwards.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotAlive`](crate::EcsError::EntityNotAlive),
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<()> {
        self.entities.check_alive(entity)?;
        let component = self.components.component_type::<T>()?;

        let moved = self.components.store_mut::<T>()?.remove(entity)?;

        let mut signature = self.entities.signature(entity)?;
        signature.remove(component);
        self.entities.set_signature(entity, signature)?;

        if let Some(moved) = moved {
            self.systems.component_relocated(component, moved);
        }
        self.systems.entity_signature_changed(entity, signature);
        Ok(())
    }

    /// Checks whether a live entity has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.components
            .store::<T>()
            .is_ok_and(|store| store.contains(entity))
    }

    /// Gets an entity's component.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    #[inline]
    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.components.store::<T>()?.get(entity)
    }

    /// Gets an entity's component mutably.
    ///
    /// Systems are not told about the change; use
    /// [`update_component`](Self::update_component) or mark the entity dirty
    /// explicitly when a mirror must follow.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    #[inline]
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.components.store_mut::<T>()?.get_mut(entity)
    }

    /// Mutates an entity's component in place and tells every system about it.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    pub fn update_component<T: Component, R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> EcsResult<R> {
        let component = self.components.component_type::<T>()?;
        let result = f(self.components.store_mut::<T>()?.get_mut(entity)?);
        self.systems.component_modified(component, entity);
        Ok(result)
    }

    /// Gets the component at a dense index.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::IndexOutOfRange`](crate::EcsError::IndexOutOfRange).
    #[inline]
    pub fn get_component_by_index<T: Component>(&self, index: usize) -> EcsResult<&T> {
        self.components.store::<T>()?.get_by_index(index)
    }

    /// Dense index of an entity's component. Valid until the next removal.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    #[inline]
    pub fn get_index<T: Component>(&self, entity: Entity) -> EcsResult<usize> {
        self.components.store::<T>()?.index(entity)
    }

    /// Byte offset of an entity's component. Valid until the next removal.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// or [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    #[inline]
    pub fn get_offset<T: Component>(&self, entity: Entity) -> EcsResult<usize> {
        self.components.store::<T>()?.offset(entity)
    }

    /// The dense array of `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent).
    #[inline]
    pub fn data<T: Component>(&self) -> EcsResult<&[T]> {
        Ok(self.components.store::<T>()?.as_slice())
    }

    /// The dense array of `T` as raw bytes.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent).
    #[inline]
    pub fn data_bytes<T: Component>(&self) -> EcsResult<&[u8]> {
        Ok(self.components.store::<T>()?.as_bytes())
    }

    /// Occupied byte extent of `T`'s dense array.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent).
    #[inline]
    pub fn size<T: Component>(&self) -> EcsResult<usize> {
        Ok(self.components.store::<T>()?.size_bytes())
    }

    /// The store of `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent).
    #[inline]
    pub fn store<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        self.components.store::<T>()
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers a default-constructed system.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`](crate::EcsError::DuplicateSystem).
    pub fn register_system<S: System + Default>(&mut self) -> EcsResult<&mut S> {
        self.register_system_with(S::default())
    }

    /// Registers an already constructed system.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`](crate::EcsError::DuplicateSystem), or any
    /// error raised by the system's registration hook.
    pub fn register_system_with<S: System>(&mut self, system: S) -> EcsResult<&mut S> {
        self.systems.register(system, &self.components)
    }

    /// Sets the mask a system requires and recomputes its membership over
    /// every live entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`](crate::EcsError::UnknownSystem).
    pub fn set_system_signature<S: System>(&mut self, required: Signature) -> EcsResult<()> {
        self.systems.set_signature::<S>(required)?;
        self.systems.refresh::<S>(self.entities.iter_alive())
    }

    /// Registered instance of `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`](crate::EcsError::UnknownSystem).
    #[inline]
    pub fn get_system<S: System>(&self) -> EcsResult<&S> {
        self.systems.get::<S>()
    }

    /// Registered instance of `S`, mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSystem`](crate::EcsError::UnknownSystem).
    #[inline]
    pub fn get_system_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        self.systems.get_mut::<S>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::system::EntitySet;
    use crate::error::EcsError;
    use bytemuck::{Pod, Zeroable};

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Transform {
        position: [f32; 3],
        scale: f32,
    }
    impl Component for Transform {}

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Material {
        id: u32,
    }
    impl Component for Material {}

    #[derive(Default)]
    struct Renderables {
        entities: EntitySet,
    }

    impl System for Renderables {
        fn entities(&self) -> &EntitySet {
            &self.entities
        }

        fn entities_mut(&mut self) -> &mut EntitySet {
            &mut self.entities
        }
    }

    fn transform(x: f32) -> Transform {
        Transform {
            position: [x, 0.0, 0.0],
            scale: 1.0,
        }
    }

    fn coordinator() -> Coordinator {
        let mut c = Coordinator::with_capacity(32);
        c.register_component::<Transform>().unwrap();
        c.register_component::<Material>().unwrap();
        c.register_system::<Renderables>().unwrap();
        let required = Signature::of(&[
            c.component_type::<Transform>().unwrap(),
            c.component_type::<Material>().unwrap(),
        ]);
        c.set_system_signature::<Renderables>(required).unwrap();
        c
    }

    fn is_member(c: &Coordinator, e: Entity) -> bool {
        c.get_system::<Renderables>().unwrap().entities().contains(&e)
    }

    #[test]
    fn test_add_get_remove() {
        let mut c = coordinator();
        let e = c.create_entity().unwrap();

        c.add_component(e, transform(3.0)).unwrap();
        assert_eq!(*c.get_component::<Transform>(e).unwrap(), transform(3.0));
        assert!(c.has_component::<Transform>(e));

        c.remove_component::<Transform>(e).unwrap();
        assert!(matches!(
            c.get_component::<Transform>(e),
            Err(EcsError::MissingComponent { .. })
        ));
        assert!(c.signature(e).unwrap().is_empty());
    }

    #[test]
    fn test_signature_bits_track_components() {
        let mut c = coordinator();
        let e = c.create_entity().unwrap();
        let material = c.component_type::<Material>().unwrap();

        c.add_component(e, Material { id: 9 }).unwrap();
        assert!(c.signature(e).unwrap().contains(material));
    }

    #[test]
    fn test_membership_after_every_mutation() {
        let mut c = coordinator();
        let e = c.create_entity().unwrap();

        c.add_component(e, transform(0.0)).unwrap();
        assert!(!is_member(&c, e));

        c.add_component(e, Material { id: 1 }).unwrap();
        assert!(is_member(&c, e));

        c.remove_component::<Material>(e).unwrap();
        assert!(!is_member(&c, e));

        c.add_component(e, Material { id: 2 }).unwrap();
        c.destroy_entity(e).unwrap();
        assert!(!is_member(&c, e));
    }

    #[test]
    fn test_destroy_cascades_to_stores() {
        let mut c = coordinator();
        let a = c.create_entity().unwrap();
        let b = c.create_entity().unwrap();
        c.add_component(a, transform(1.0)).unwrap();
        c.add_component(b, transform(2.0)).unwrap();

        c.destroy_entity(a).unwrap();
        assert_eq!(c.size::<Transform>().unwrap(), std::mem::size_of::<Transform>());
        assert_eq!(c.get_index::<Transform>(b).unwrap(), 0);
        assert_eq!(c.living_count(), 1);
    }

    #[test]
    fn test_dead_entities_are_rejected() {
        let mut c = coordinator();
        let e = c.create_entity().unwrap();
        c.destroy_entity(e).unwrap();

        assert_eq!(
            c.add_component(e, transform(0.0)),
            Err(EcsError::EntityNotAlive(e.id()))
        );
        assert_eq!(c.destroy_entity(e), Err(EcsError::EntityNotAlive(e.id())));
    }

    #[test]
    fn test_late_signature_picks_up_existing_entities() {
        let mut c = Coordinator::with_capacity(8);
        c.register_component::<Material>().unwrap();
        let e = c.create_entity().unwrap();
        c.add_component(e, Material { id: 4 }).unwrap();

        c.register_system::<Renderables>().unwrap();
        assert!(!is_member(&c, e));

        let required = Signature::of(&[c.component_type::<Material>().unwrap()]);
        c.set_system_signature::<Renderables>(required).unwrap();
        assert!(is_member(&c, e));
    }

    #[test]
    fn test_update_component_mutates_in_place() {
        let mut c = coordinator();
        let e = c.create_entity().unwrap();
        c.add_component(e, transform(1.0)).unwrap();

        let scale = c
            .update_component::<Transform, _>(e, |t| {
                t.scale = 4.0;
                t.scale
            })
            .unwrap();
        assert!((scale - 4.0).abs() < f32::EPSILON);
        assert!((c.get_component::<Transform>(e).unwrap().scale - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unregistered_component_fails() {
        let mut c = Coordinator::with_capacity(4);
        let e = c.create_entity().unwrap();
        assert!(matches!(
            c.add_component(e, Material { id: 0 }),
            Err(EcsError::UnregisteredComponent(_))
        ));
        assert!(c.signature(e).unwrap().is_empty());
    }
}
