//! # Component Registry
//!
//! Hands out [`ComponentType`] tags in registration order and owns one
//! [`ComponentStore`] per registered type.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::Component;
use super::entity::{ComponentType, Entity, MAX_COMPONENTS};
use super::storage::{ComponentStore, ErasedStore};
use crate::error::{EcsError, EcsResult};

/// Owner of every component store.
///
/// Stores are indexed by their tag, so `stores[tag]` is the store for the
/// type registered `tag`-th.
pub struct ComponentRegistry {
    /// Registration-order tag of each component type.
    types: HashMap<TypeId, ComponentType>,
    /// Type-erased stores, indexed by tag.
    stores: Vec<Box<dyn ErasedStore>>,
    /// Entity capacity passed to every new store.
    capacity: usize,
}

impl ComponentRegistry {
    /// Creates an empty registry whose stores accept ids in `[0, capacity)`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            types: HashMap::new(),
            stores: Vec::new(),
            capacity,
        }
    }

    /// Entity capacity of every store.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// True if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Registers `T` and creates its store.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateRegistration`] if `T` is already registered,
    /// [`EcsError::TooManyComponentTypes`] once every signature bit is taken.
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentType> {
        let type_id = TypeId::of::<T>();
        if self.types.contains_key(&type_id) {
            return Err(EcsError::DuplicateRegistration(T::name()));
        }
        let Ok(tag) = u8::try_from(self.stores.len()) else {
            return Err(self.exhausted::<T>());
        };
        if usize::from(tag) >= MAX_COMPONENTS {
            return Err(self.exhausted::<T>());
        }

        let ty = ComponentType::new(tag);
        self.types.insert(type_id, ty);
        self.stores
            .push(Box::new(ComponentStore::<T>::new(self.capacity)));

        tracing::debug!(component = T::name(), tag, "registered component type");
        Ok(ty)
    }

    /// Tag of a registered type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` is unknown.
    #[inline]
    pub fn component_type<T: Component>(&self) -> EcsResult<ComponentType> {
        self.types
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent(T::name()))
    }

    /// Checks whether `T` is registered.
    #[inline]
    #[must_use]
    pub fn is_registered<T: Component>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    /// Store of a registered type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` is unknown.
    pub fn store<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        let ty = self.component_type::<T>()?;
        self.stores[usize::from(ty.tag())]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .ok_or(EcsError::UnregisteredComponent(T::name()))
    }

    /// Mutable store of a registered type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` is unknown.
    pub fn store_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        let ty = self.component_type::<T>()?;
        self.stores[usize::from(ty.tag())]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(EcsError::UnregisteredComponent(T::name()))
    }

    /// Drops `entity`'s components from every store.
    ///
    /// `on_relocate` is called once per store in which swap-with-last moved
    /// another entity into the freed slot.
    pub fn entity_destroyed(
        &mut self,
        entity: Entity,
        mut on_relocate: impl FnMut(ComponentType, Entity),
    ) {
        for (tag, store) in self.stores.iter_mut().enumerate() {
            if let Some(moved) = store.entity_destroyed(entity) {
                #[allow(clippy::cast_possible_truncation)]
                on_relocate(ComponentType::new(tag as u8), moved);
            }
        }
    }

    #[cold]
    fn exhausted<T: Component>(&self) -> EcsError {
        EcsError::TooManyComponentTypes {
            component: T::name(),
            max: MAX_COMPONENTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Signature;
    use bytemuck::{Pod, Zeroable};

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Mass(f32);
    impl Component for Mass {}

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Albedo([f32; 4]);
    impl Component for Albedo {}

    #[test]
    fn test_tags_follow_registration_order() {
        let mut registry = ComponentRegistry::new(16);
        assert_eq!(registry.register::<Albedo>().unwrap().tag(), 0);
        assert_eq!(registry.register::<Mass>().unwrap().tag(), 1);
        assert_eq!(registry.component_type::<Mass>().unwrap().tag(), 1);
        assert_eq!(registry.len(), 2);
    }

    // Distinct byte-array types to fill every signature bit.
    impl<const N: usize> Component for [u8; N] where [u8; N]: Pod {}
    impl<const N: usize> Component for [u16; N] where [u16; N]: Pod {}
    impl Component for [u32; 1] {}

    macro_rules! register_arrays {
        ($registry:ident, $elem:ty) => {
            register_arrays!(@each $registry, $elem;
                1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16
                17 18 19 20 21 22 23 24 25 26 27 28 29 30 31 32);
        };
        (@each $registry:ident, $elem:ty; $($n:literal)*) => {
            $( $registry.register::<[$elem; $n]>().unwrap(); )*
        };
    }

    #[test]
    fn test_signature_width_limit() {
        let mut registry = ComponentRegistry::new(4);
        register_arrays!(registry, u8);
        register_arrays!(registry, u16);
        assert_eq!(registry.len(), MAX_COMPONENTS);

        let last = registry.component_type::<[u16; 32]>().unwrap();
        assert_eq!(last.tag(), 63);
        let sig = Signature::EMPTY.with(last);
        assert!(sig.contains(last));
        assert_eq!(sig.bits(), 1 << 63);

        assert!(matches!(
            registry.register::<[u32; 1]>(),
            Err(EcsError::TooManyComponentTypes { max: 64, .. })
        ));
        assert!(!registry.is_registered::<[u32; 1]>());
        assert_eq!(registry.len(), MAX_COMPONENTS);
    }

    #[test]
    fn test_double_registration_fails() {
        let mut registry = ComponentRegistry::new(16);
        assert!(!registry.is_registered::<Mass>());
        registry.register::<Mass>().unwrap();
        assert!(registry.is_registered::<Mass>());
        assert!(matches!(
            registry.register::<Mass>(),
            Err(EcsError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn test_unregistered_access_fails() {
        let registry = ComponentRegistry::new(16);
        assert!(matches!(
            registry.store::<Mass>(),
            Err(EcsError::UnregisteredComponent(_))
        ));
    }

    #[test]
    fn test_destroy_cascades_and_reports_relocation() {
        let mut registry = ComponentRegistry::new(16);
        let mass = registry.register::<Mass>().unwrap();
        registry.register::<Albedo>().unwrap();

        let (a, b) = (Entity::from_raw(0), Entity::from_raw(1));
        let masses = registry.store_mut::<Mass>().unwrap();
        masses.insert(a, Mass(1.0)).unwrap();
        masses.insert(b, Mass(2.0)).unwrap();
        registry
            .store_mut::<Albedo>()
            .unwrap()
            .insert(a, Albedo([1.0; 4]))
            .unwrap();

        let mut relocations = Vec::new();
        registry.entity_destroyed(a, |ty, moved| relocations.push((ty, moved)));

        // Albedo held only `a`, so nothing moved there.
        assert_eq!(relocations, vec![(mass, b)]);
        assert_eq!(registry.store::<Mass>().unwrap().index(b).unwrap(), 0);
        assert!(registry.store::<Albedo>().unwrap().is_empty());
    }
}
