//! # Coordinator Benchmark
//!
//! Entity and component churn through the Coordinator, with and without a
//! buffered sync system listening.
//!
//! Run with: `cargo bench --package meridian_core --bench coordinator_benchmark`

#![allow(missing_docs)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meridian_core::{BufferedSync, Component, Coordinator, Entity, Signature};

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct DeviceTransform([f32; 16]);
impl Component for DeviceTransform {}

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct MaterialId(u32);
impl Component for MaterialId {}

fn coordinator(with_sync: bool) -> Coordinator {
    let mut c = Coordinator::with_capacity(ENTITY_COUNT);
    let transform = c.register_component::<DeviceTransform>().unwrap();
    c.register_component::<MaterialId>().unwrap();
    if with_sync {
        c.register_system_with(BufferedSync::<DeviceTransform>::for_entities(2, ENTITY_COUNT))
            .unwrap();
        c.set_system_signature::<BufferedSync<DeviceTransform>>(Signature::of(&[transform]))
            .unwrap();
    }
    c
}

/// Benchmark: create entities until the coordinator is full.
fn bench_create_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entities");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut c = Coordinator::with_capacity(count);
                for _ in 0..count {
                    black_box(c.create_entity().unwrap());
                }
                c.living_count()
            });
        });
    }

    group.finish();
}

/// Benchmark: add then remove a component on every entity.
fn bench_component_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("component_churn_100k");

    for with_sync in [false, true] {
        let mut coord = coordinator(with_sync);
        let entities: Vec<Entity> = (0..ENTITY_COUNT)
            .map(|_| coord.create_entity().unwrap())
            .collect();

        let label = if with_sync { "with_buffered_sync" } else { "plain" };
        group.bench_function(label, |b| {
            b.iter(|| {
                for &e in &entities {
                    coord.add_component(e, DeviceTransform([1.0; 16])).unwrap();
                }
                for &e in &entities {
                    coord.remove_component::<DeviceTransform>(e).unwrap();
                }
            });
        });
    }

    group.finish();
}

/// Benchmark: in-place updates that notify the sync system.
fn bench_update_component(c: &mut Criterion) {
    let mut coord = coordinator(true);
    let entities: Vec<Entity> = (0..ENTITY_COUNT)
        .map(|_| {
            let e = coord.create_entity().unwrap();
            coord.add_component(e, DeviceTransform([0.0; 16])).unwrap();
            e
        })
        .collect();

    c.bench_function("update_component_100k", |b| {
        b.iter(|| {
            for &e in &entities {
                coord
                    .update_component::<DeviceTransform, _>(e, |t| t.0[12] += 1.0)
                    .unwrap();
            }
        });
    });
}

/// Benchmark: destroy and recreate a tenth of the entities.
fn bench_destroy_recreate(c: &mut Criterion) {
    let mut coord = coordinator(true);
    let mut entities: Vec<Entity> = (0..ENTITY_COUNT)
        .map(|_| {
            let e = coord.create_entity().unwrap();
            coord.add_component(e, DeviceTransform([0.0; 16])).unwrap();
            e
        })
        .collect();

    c.bench_function("destroy_recreate_10pct", |b| {
        b.iter(|| {
            for e in entities.iter_mut().step_by(10) {
                coord.destroy_entity(*e).unwrap();
                *e = coord.create_entity().unwrap();
                coord.add_component(*e, DeviceTransform([0.0; 16])).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_create_entities,
    bench_component_churn,
    bench_update_component,
    bench_destroy_recreate,
);
criterion_main!(benches);
