use std::sync::Arc;

use approx::assert_abs_diff_eq;
use particle_narrowphase::*;

fn assert_send_sync<T: Send + Sync>() {}

/// A row of boxes resting on a ground slab, each overlapping the slab and its neighbour.
fn box_row(count: usize) -> (Arena<CollisionObject>, Vec<(EntityId, EntityId)>) {
    let mut objects = Arena::new();
    let ground = objects.insert_with(|id| {
        CollisionObject::builder()
            .id(id)
            .shape(ConvexShape::cuboid(Vec3::new(50.0, 0.5, 2.0)))
            .build()
    });

    let mut overlaps = Vec::new();
    let mut previous = None;
    for i in 0..count {
        let position = Vec3::new(i as f32 * 0.98, 0.97, 0.0);
        let rotation = Quat::from_rotation_y(0.01 * i as f32);
        let id = objects.insert_with(|id| {
            CollisionObject::builder()
                .id(id)
                .shape(ConvexShape::cuboid(Vec3::splat(0.5)))
                .transform(Transform::from_position_rotation(position, rotation))
                .build()
        });
        overlaps.push((ground, id));
        if let Some(prev) = previous {
            overlaps.push((prev, id));
        }
        previous = Some(id);
    }
    (objects, overlaps)
}

fn snapshot(
    narrowphase: &NarrowPhase,
    overlaps: &[(EntityId, EntityId)],
) -> Vec<Vec<(Vec3, Vec3, f32)>> {
    overlaps
        .iter()
        .map(|&(a, b)| {
            narrowphase
                .pair_manifold(a, b)
                .map(|m| {
                    m.points()
                        .iter()
                        .map(|p| (p.position_world_on_b, p.normal_world_on_b, p.distance))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

#[test]
fn narrowphase_is_send_and_sync() {
    assert_send_sync::<NarrowPhase>();
    assert_send_sync::<PersistentManifold>();
    assert_send_sync::<ContactHooks>();
    assert_send_sync::<ContactEventLog>();
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let (objects, overlaps) = box_row(32);

    let mut sequential = NarrowPhase::new(CollisionConfig::default().with_parallel(false));
    let mut parallel = NarrowPhase::new(CollisionConfig::default().with_parallel(true));
    for narrowphase in [&mut sequential, &mut parallel] {
        narrowphase.sync_pairs(&objects, &overlaps);
        for _ in 0..3 {
            narrowphase.process_pairs(&objects);
        }
    }

    let expected = snapshot(&sequential, &overlaps);
    let actual = snapshot(&parallel, &overlaps);
    assert_eq!(expected.len(), actual.len());
    for (seq, par) in expected.iter().zip(&actual) {
        assert_eq!(seq.len(), par.len());
        for (s, p) in seq.iter().zip(par) {
            assert_abs_diff_eq!(s.0, p.0, epsilon = 1e-6);
            assert_abs_diff_eq!(s.1, p.1, epsilon = 1e-6);
            assert_abs_diff_eq!(s.2, p.2, epsilon = 1e-6);
        }
    }
    assert_eq!(
        sequential.profiler().contact_count,
        parallel.profiler().contact_count
    );
    assert!(parallel.profiler().touching_manifolds >= 32);
}

#[test]
fn event_log_records_start_and_end_from_worker_threads() {
    let (mut objects, overlaps) = box_row(8);
    let log = Arc::new(ContactEventLog::new());
    let hooks = ContactHooks::new().with_event_log(Arc::clone(&log));
    let mut narrowphase =
        NarrowPhase::new(CollisionConfig::default().with_parallel(true)).with_hooks(hooks);

    narrowphase.sync_pairs(&objects, &overlaps);
    narrowphase.process_pairs(&objects);
    let touching = narrowphase.manifolds().filter(|(_, m)| m.num_contacts() > 0).count();
    assert!(touching >= 8);
    let started = log
        .drain()
        .into_iter()
        .filter(|e| matches!(e, ContactEvent::Started { .. }))
        .count();
    assert_eq!(started, touching);

    // Lift every box well clear of the ground and spread them out.
    let ground = overlaps[0].0;
    let boxes: Vec<EntityId> = objects.keys().filter(|&id| id != ground).collect();
    for (i, id) in boxes.iter().enumerate() {
        if let Some(object) = objects.get_mut(*id) {
            object.transform.position = Vec3::new(i as f32 * 10.0, 5.0, 0.0);
        }
    }
    narrowphase.process_pairs(&objects);

    let ended = log
        .drain()
        .into_iter()
        .filter(|e| matches!(e, ContactEvent::Ended { .. }))
        .count();
    assert_eq!(ended, touching);
    assert_eq!(narrowphase.touching_manifolds().count(), 0);
}
