//! Integration tests for the reconcile phases against a recording renderer.

use atomify_core::reconcile::{grow, partition, place_all, reconcile};
use atomify_core::{AtomType, EntityPool, EntityRenderer, ParticleState, ParticleStyle, Position};

/// Handle that remembers its type and every position it was given.
#[derive(Debug)]
struct Sphere {
    atom_type: AtomType,
    trail: Vec<Position>,
}

#[derive(Default)]
struct SceneRecorder {
    spawned: Vec<AtomType>,
}

impl EntityRenderer for SceneRecorder {
    type Handle = Sphere;

    fn create_entity(&mut self, atom_type: AtomType, _style: &ParticleStyle) -> Sphere {
        self.spawned.push(atom_type);
        Sphere {
            atom_type,
            trail: Vec::new(),
        }
    }

    fn place(&mut self, handle: &mut Sphere, position: Position) {
        handle.trail.push(position);
    }
}

fn state(types: &[u32], positions: &[[f32; 3]]) -> ParticleState {
    ParticleState::new(
        positions.iter().copied().map(Position::from).collect(),
        types.iter().map(|&t| AtomType(t)).collect(),
    )
    .unwrap()
}

fn current(pool: &EntityPool<SceneRecorder>, atom_type: AtomType) -> Vec<Position> {
    pool.handles(atom_type)
        .map(|s| *s.trail.last().unwrap())
        .collect()
}

#[test]
fn first_tick_places_each_type_in_encounter_order() {
    let mut pool = EntityPool::new(SceneRecorder::default());
    let s = state(&[1, 1, 2], &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);

    let snapshot = reconcile(&mut pool, &s).unwrap();

    assert!(pool.handle_count(AtomType(1)) >= 2);
    assert!(pool.handle_count(AtomType(2)) >= 1);
    assert_eq!(
        current(&pool, AtomType(1)),
        vec![Position::new(0.0, 0.0, 0.0), Position::new(1.0, 0.0, 0.0)]
    );
    assert_eq!(current(&pool, AtomType(2)), vec![Position::new(2.0, 0.0, 0.0)]);
    assert!(pool.handles(AtomType(2)).all(|s| s.atom_type == AtomType(2)));
    assert_eq!(snapshot.positions_for(AtomType(1)), current(&pool, AtomType(1)));
}

#[test]
fn every_particle_lands_on_its_reported_position() {
    let mut pool = EntityPool::new(SceneRecorder::default());
    let types = [3, 1, 2, 1, 3, 3, 2];
    let positions: Vec<[f32; 3]> = (0u8..7).map(|i| [f32::from(i), f32::from(i) * 2.0, -1.0]).collect();
    let s = state(&types, &positions);

    let p = partition(&s);
    grow(&mut pool, &p);
    let snapshot = place_all(&mut pool, &s, &p).unwrap();

    for (i, placement) in snapshot.placements().iter().enumerate() {
        assert_eq!(placement.position, Position::from(positions[i]));
        let handle = pool.handles(placement.atom_type).nth(placement.slot).unwrap();
        assert_eq!(handle.trail.last(), Some(&placement.position));
    }
}

#[test]
fn pool_is_monotonic_over_ticks() {
    let mut pool = EntityPool::new(SceneRecorder::default());
    let ticks = [
        state(&[1], &[[0.0; 3]]),
        state(&[1, 2], &[[0.0; 3], [1.0; 3]]),
        state(&[1, 2, 2, 1], &[[0.0; 3], [1.0; 3], [2.0; 3], [3.0; 3]]),
        state(&[2], &[[4.0; 3]]),
        ParticleState::empty(),
    ];

    let mut previous: Vec<(AtomType, usize)> = Vec::new();
    for s in &ticks {
        reconcile(&mut pool, s).unwrap();
        let counts = pool.handle_counts();
        for (atom_type, before) in &previous {
            assert!(pool.handle_count(*atom_type) >= *before);
        }
        previous = counts;
    }

    assert_eq!(pool.handle_count(AtomType(1)), 2);
    assert_eq!(pool.handle_count(AtomType(2)), 2);
    assert_eq!(pool.renderer().spawned.len(), 4);
}

#[test]
fn new_type_after_reset_grows_without_reclaiming() {
    let mut pool = EntityPool::new(SceneRecorder::default());
    reconcile(&mut pool, &state(&[1, 2, 2], &[[0.0; 3], [1.0; 3], [2.0; 3]])).unwrap();

    // A reset into a single-species system introduces type 3 only.
    reconcile(&mut pool, &state(&[3, 3], &[[7.0; 3], [8.0; 3]])).unwrap();

    assert_eq!(pool.handle_count(AtomType(1)), 1);
    assert_eq!(pool.handle_count(AtomType(2)), 2);
    assert_eq!(pool.handle_count(AtomType(3)), 2);
    assert_eq!(current(&pool, AtomType(2)), vec![Position::new(1.0, 1.0, 1.0), Position::new(2.0, 2.0, 2.0)]);
}
