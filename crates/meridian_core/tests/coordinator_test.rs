//! # Coordinator Integration Tests
//!
//! Entity lifecycle, dense storage and system membership as seen from the
//! public API.
//!
//! Run with: cargo test -p meridian_core --test coordinator_test

use std::collections::BTreeSet;

use bytemuck::{Pod, Zeroable};
use meridian_core::{
    Component, Coordinator, EcsConfig, EcsError, Entity, EntitySet, Signature, System,
};

#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Bounds {
    min: [f32; 2],
    max: [f32; 2],
}
impl Component for Bounds {}

#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Layer(u32);
impl Component for Layer {}

#[derive(Default)]
struct Culling {
    entities: EntitySet,
}

impl System for Culling {
    fn entities(&self) -> &EntitySet {
        &self.entities
    }

    fn entities_mut(&mut self) -> &mut EntitySet {
        &mut self.entities
    }
}

fn bounds(x: f32) -> Bounds {
    Bounds {
        min: [x, x],
        max: [x + 1.0, x + 1.0],
    }
}

#[test]
fn config_from_toml_sizes_the_coordinator() {
    let config = EcsConfig::from_toml_str("max_entities = 3\n").unwrap();
    assert_eq!(config.frames_in_flight, 2);

    let mut c = Coordinator::new(&config);
    for _ in 0..3 {
        c.create_entity().unwrap();
    }
    assert_eq!(
        c.create_entity(),
        Err(EcsError::CapacityExceeded { capacity: 3 })
    );
}

#[test]
fn invalid_config_is_rejected() {
    assert!(matches!(
        EcsConfig::from_toml_str("frames_in_flight = 0"),
        Err(EcsError::InvalidConfig(_))
    ));
    assert!(matches!(
        EcsConfig::from_toml_str("max_entities = \"many\""),
        Err(EcsError::InvalidConfig(_))
    ));
}

#[test]
fn ids_are_reused_in_release_order() {
    let mut c = Coordinator::with_capacity(4);
    let all: Vec<Entity> = (0..4).map(|_| c.create_entity().unwrap()).collect();

    c.destroy_entity(all[2]).unwrap();
    c.destroy_entity(all[0]).unwrap();
    assert_eq!(c.create_entity().unwrap(), all[2]);
    assert_eq!(c.create_entity().unwrap(), all[0]);
}

#[test]
fn dense_array_stays_compact() {
    let mut c = Coordinator::with_capacity(16);
    c.register_component::<Bounds>().unwrap();
    let entities: Vec<Entity> = (0..8)
        .map(|i| {
            let e = c.create_entity().unwrap();
            c.add_component(e, bounds(i as f32)).unwrap();
            e
        })
        .collect();

    for &e in entities.iter().step_by(3) {
        c.destroy_entity(e).unwrap();
    }
    c.remove_component::<Bounds>(entities[4]).unwrap();

    let live = c.size::<Bounds>().unwrap() / std::mem::size_of::<Bounds>();
    assert_eq!(live, 4);
    assert_eq!(c.data::<Bounds>().unwrap().len(), live);

    // Every survivor still maps to its own value.
    for (i, &e) in entities.iter().enumerate() {
        if c.has_component::<Bounds>(e) {
            assert_eq!(*c.get_component::<Bounds>(e).unwrap(), bounds(i as f32));
            let index = c.get_index::<Bounds>(e).unwrap();
            assert_eq!(*c.get_component_by_index::<Bounds>(index).unwrap(), bounds(i as f32));
            assert_eq!(c.get_offset::<Bounds>(e).unwrap(), index * std::mem::size_of::<Bounds>());
        }
    }
}

#[test]
fn three_entity_removal_compacts_in_place() {
    let mut c = Coordinator::with_capacity(4);
    c.register_component::<Bounds>().unwrap();
    let e: Vec<Entity> = (0..3).map(|_| c.create_entity().unwrap()).collect();
    for (i, &entity) in e.iter().enumerate() {
        c.add_component(entity, bounds(i as f32)).unwrap();
    }

    c.remove_component::<Bounds>(e[1]).unwrap();
    assert_eq!(c.size::<Bounds>().unwrap(), 2 * 16);
    assert_eq!(c.get_index::<Bounds>(e[2]).unwrap(), 1);
    assert!(matches!(
        c.get_component::<Bounds>(e[1]),
        Err(EcsError::MissingComponent { .. })
    ));
}

#[test]
fn membership_matches_signatures() {
    let mut c = Coordinator::with_capacity(16);
    let b = c.register_component::<Bounds>().unwrap();
    let l = c.register_component::<Layer>().unwrap();
    c.register_system::<Culling>().unwrap();
    c.set_system_signature::<Culling>(Signature::of(&[b, l]))
        .unwrap();

    let mut expected = BTreeSet::new();
    for i in 0..12u32 {
        let e = c.create_entity().unwrap();
        c.add_component(e, bounds(i as f32)).unwrap();
        if i % 2 == 0 {
            c.add_component(e, Layer(i)).unwrap();
            expected.insert(e);
        }
        if i % 4 == 0 {
            c.remove_component::<Bounds>(e).unwrap();
            expected.remove(&e);
        }
        if i % 6 == 0 {
            c.destroy_entity(e).unwrap();
            expected.remove(&e);
        }
    }

    let members = c.get_system::<Culling>().unwrap().entities();
    assert_eq!(*members, expected);
    for &e in members {
        assert!(c.signature(e).unwrap().satisfies(Signature::of(&[b, l])));
    }
}

#[test]
fn duplicate_and_missing_components_are_errors() {
    let mut c = Coordinator::with_capacity(4);
    c.register_component::<Layer>().unwrap();
    let e = c.create_entity().unwrap();

    c.add_component(e, Layer(1)).unwrap();
    assert!(matches!(
        c.add_component(e, Layer(2)),
        Err(EcsError::DuplicateComponent { .. })
    ));
    assert_eq!(c.get_component::<Layer>(e), Ok(&Layer(1)));

    c.remove_component::<Layer>(e).unwrap();
    assert!(matches!(
        c.remove_component::<Layer>(e),
        Err(EcsError::MissingComponent { .. })
    ));
    assert!(matches!(
        c.register_component::<Layer>(),
        Err(EcsError::DuplicateRegistration(_))
    ));
}
