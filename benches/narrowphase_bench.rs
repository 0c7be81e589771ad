use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use particle_narrowphase::*;
use std::hint::black_box;

/// A grid of mixed shapes resting on one slab; every body pairs with the slab and its
/// right-hand neighbour.
fn build_scene(count: usize) -> (Arena<CollisionObject>, Vec<(EntityId, EntityId)>) {
    let mut objects = Arena::new();
    let ground = objects.insert_with(|id| {
        CollisionObject::builder()
            .id(id)
            .shape(ConvexShape::cuboid(Vec3::new(1000.0, 0.5, 1000.0)))
            .build()
    });

    let side = (count as f32).sqrt().ceil() as usize;
    let mut overlaps = Vec::with_capacity(count * 2);
    let mut previous = None;
    for i in 0..count {
        let shape: CollisionShape = match i % 3 {
            0 => ConvexShape::cuboid(Vec3::splat(0.5)).into(),
            1 => ConvexShape::sphere(0.5).into(),
            _ => ConvexShape::capsule(0.3, 0.4, UpAxis::Y).into(),
        };
        let position = Vec3::new((i % side) as f32 * 0.95, 0.98, (i / side) as f32 * 1.5);
        let id = objects.insert_with(|id| {
            CollisionObject::builder()
                .id(id)
                .shape(shape)
                .position(position)
                .build()
        });
        overlaps.push((ground, id));
        if let Some(prev) = previous.filter(|_| i % side != 0) {
            overlaps.push((prev, id));
        }
        previous = Some(id);
    }
    (objects, overlaps)
}

fn bench_process_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrowphase_process_pairs");

    for &count in &[100usize, 1000, 5000] {
        let (objects, overlaps) = build_scene(count);

        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, _| {
            let mut narrowphase = NarrowPhase::new(CollisionConfig::default().with_parallel(false));
            narrowphase.sync_pairs(&objects, &overlaps);
            b.iter(|| {
                narrowphase.process_pairs(&objects);
                black_box(narrowphase.profiler().contact_count);
            })
        });

        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, _| {
            let mut narrowphase = NarrowPhase::new(CollisionConfig::default().with_parallel(true));
            narrowphase.sync_pairs(&objects, &overlaps);
            b.iter(|| {
                narrowphase.process_pairs(&objects);
                black_box(narrowphase.profiler().contact_count);
            })
        });
    }
    group.finish();
}

fn bench_pair_churn(c: &mut Criterion) {
    let (objects, overlaps) = build_scene(1000);
    c.bench_function("narrowphase_sync_pairs_churn", |b| {
        let mut narrowphase = NarrowPhase::default();
        b.iter(|| {
            black_box(narrowphase.sync_pairs(&objects, &overlaps));
            black_box(narrowphase.sync_pairs(&objects, &[]));
        })
    });
}

criterion_group!(benches, bench_process_pairs, bench_pair_churn);
criterion_main!(benches);
