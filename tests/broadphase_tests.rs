use std::collections::BTreeSet;

use cannonball::collision::broadphase::{
    needs_broadphase_collision, BroadPhase, NaiveBroadphase, SweepAndPrune,
};
use cannonball::collision::{NarrowPhase, NarrowphaseOutput};
use cannonball::config::PLANE_CONTACT_SKIN;
use cannonball::core::types::MaterialTable;
use cannonball::utils::allocator::{Arena, BodyId};
use cannonball::{Body, BoundingVolume, Quat, Shape, SweepAxis, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_scene(seed: u64, count: usize) -> Arena<Body> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bodies = Arena::new();
    for i in 0..count {
        let position = Vec3::new(
            rng.gen_range(-6.0..6.0),
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-6.0..6.0),
        );
        let shape = if rng.gen_bool(0.5) {
            Shape::sphere(rng.gen_range(0.2..1.0)).unwrap()
        } else {
            Shape::cuboid(Vec3::new(
                rng.gen_range(0.1..0.8),
                rng.gen_range(0.1..0.8),
                rng.gen_range(0.1..0.8),
            ))
            .unwrap()
        };
        let mass = if i % 7 == 0 { 0.0 } else { 1.0 };
        bodies.insert(Body::new(mass).with_shape(shape).with_position(position));
    }
    bodies
}

fn pair_set(
    broadphase: &mut dyn BroadPhase,
    bodies: &Arena<Body>,
    volume: BoundingVolume,
) -> BTreeSet<(usize, usize)> {
    let mut pairs: Vec<(BodyId, BodyId)> = Vec::new();
    broadphase.collision_pairs(bodies, volume, &mut pairs);
    let set: BTreeSet<(usize, usize)> = pairs.iter().map(|(a, b)| (a.index(), b.index())).collect();
    assert_eq!(set.len(), pairs.len(), "duplicate pairs reported");
    for (a, b) in &set {
        assert!(a < b, "pair ({a}, {b}) not ordered");
    }
    set
}

#[test]
fn sweep_and_prune_agrees_with_naive_on_every_axis() {
    for seed in 0..4 {
        let bodies = random_scene(seed, 80);
        for volume in [BoundingVolume::Sphere, BoundingVolume::Aabb] {
            let expected = pair_set(&mut NaiveBroadphase, &bodies, volume);
            assert!(!expected.is_empty(), "seed {seed} produced no overlaps");
            for axis in [SweepAxis::X, SweepAxis::Y, SweepAxis::Z, SweepAxis::Auto] {
                let mut sap = SweepAndPrune::new(axis);
                let found = pair_set(&mut sap, &bodies, volume);
                assert_eq!(found, expected, "seed {seed}, {axis:?}, {volume:?}");
            }
        }
    }
}

#[test]
fn sweep_and_prune_tracks_moving_and_removed_bodies() {
    let mut bodies = random_scene(11, 40);
    let mut sap = SweepAndPrune::new(SweepAxis::Auto);
    let volume = BoundingVolume::Aabb;
    pair_set(&mut sap, &bodies, volume);

    let mut rng = StdRng::seed_from_u64(99);
    let ids: Vec<BodyId> = bodies.ids().collect();
    for id in ids.iter().step_by(3) {
        bodies.remove(*id);
    }
    for (_, body) in bodies.iter_mut() {
        let shift = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        body.position += shift;
    }
    for _ in 0..5 {
        bodies.insert(
            Body::new(1.0)
                .with_shape(Shape::sphere(0.6).unwrap())
                .with_position(Vec3::new(rng.gen_range(-4.0..4.0), 0.0, 0.0)),
        );
    }

    let expected = pair_set(&mut NaiveBroadphase, &bodies, volume);
    let found = pair_set(&mut sap, &bodies, volume);
    assert_eq!(found, expected);
}

#[test]
fn static_pairs_never_become_candidates() {
    let mut bodies = Arena::new();
    for i in 0..4 {
        bodies.insert(
            Body::new(0.0)
                .with_shape(Shape::sphere(1.0).unwrap())
                .with_position(Vec3::new(i as f32 * 0.5, 0.0, 0.0)),
        );
    }
    let mut naive = NaiveBroadphase;
    let mut sap = SweepAndPrune::new(SweepAxis::X);
    assert!(pair_set(&mut naive, &bodies, BoundingVolume::Sphere).is_empty());
    assert!(pair_set(&mut sap, &bodies, BoundingVolume::Sphere).is_empty());
}

fn random_orientation(rng: &mut StdRng) -> Quat {
    let axis = Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    );
    Quat::from_axis_angle(axis.try_normalize().unwrap_or(Vec3::Y), rng.gen_range(0.0..6.28))
}

fn random_direction(rng: &mut StdRng) -> Vec3 {
    loop {
        let d = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .normalize_or_zero();
        if d != Vec3::ZERO && d.abs().max_element() < 0.95 {
            return d;
        }
    }
}

/// Cluttered scene with resting, touching and grazing contacts. Returns the
/// ids of a sphere pair that touches exactly.
fn contact_scene(seed: u64) -> (Arena<Body>, (usize, usize)) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bodies = Arena::new();
    let ground_y = -4.0;

    bodies.insert(
        Body::new(0.0)
            .with_shape(Shape::plane())
            .with_position(Vec3::new(0.0, ground_y, 0.0))
            .with_orientation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
    );

    for i in 0..60 {
        let position = Vec3::new(
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-4.5..2.0),
            rng.gen_range(-5.0..5.0),
        );
        let shape = if rng.gen_bool(0.5) {
            Shape::sphere(rng.gen_range(0.2..1.0)).unwrap()
        } else {
            Shape::cuboid(Vec3::new(
                rng.gen_range(0.1..0.8),
                rng.gen_range(0.1..0.8),
                rng.gen_range(0.1..0.8),
            ))
            .unwrap()
        };
        let mass = if i % 5 == 0 { 0.0 } else { 1.0 };
        bodies.insert(
            Body::new(mass)
                .with_shape(shape)
                .with_position(position)
                .with_orientation(random_orientation(&mut rng)),
        );
    }

    // sphere pairs touching along skewed directions
    for k in 0..8 {
        let ra = rng.gen_range(0.2..0.9);
        let rb = rng.gen_range(0.2..0.9);
        let a = Vec3::new(10.0 + 4.0 * k as f32, rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
        let b = a + random_direction(&mut rng) * (ra + rb);
        for (center, radius) in [(a, ra), (b, rb)] {
            bodies.insert(
                Body::new(1.0)
                    .with_shape(Shape::sphere(radius).unwrap())
                    .with_position(center),
            );
        }
    }

    let exact_a = bodies.insert(
        Body::new(1.0)
            .with_shape(Shape::sphere(0.5).unwrap())
            .with_position(Vec3::new(20.0, 0.0, 30.0)),
    );
    let exact_b = bodies.insert(
        Body::new(1.0)
            .with_shape(Shape::sphere(0.75).unwrap())
            .with_position(Vec3::new(21.25, 0.0, 30.0)),
    );

    // spheres grazing a corner of a static box
    for k in 0..8 {
        let half = Vec3::new(
            rng.gen_range(0.3..1.0),
            rng.gen_range(0.3..1.0),
            rng.gen_range(0.3..1.0),
        );
        let center = Vec3::new(-12.0 - 4.0 * k as f32, 0.0, rng.gen_range(-2.0..2.0));
        let orientation = random_orientation(&mut rng);
        bodies.insert(
            Body::new(0.0)
                .with_shape(Shape::cuboid(half).unwrap())
                .with_position(center)
                .with_orientation(orientation),
        );
        let signs = Vec3::new(
            if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
            if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
            if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
        );
        let corner = center + orientation * (half * signs);
        let outward = (corner - center).normalize();
        let radius = rng.gen_range(0.2..0.6);
        bodies.insert(
            Body::new(1.0)
                .with_shape(Shape::sphere(radius).unwrap())
                .with_position(corner + outward * (radius - 1e-3)),
        );
    }

    // boxes hovering inside the plane contact skin
    for k in 0..4 {
        let half = Vec3::new(0.5, rng.gen_range(0.2..0.8), 0.5);
        bodies.insert(
            Body::new(1.0)
                .with_shape(Shape::cuboid(half).unwrap())
                .with_position(Vec3::new(
                    -10.0 + 3.0 * k as f32,
                    ground_y + half.y + PLANE_CONTACT_SKIN * 0.5,
                    15.0,
                )),
        );
    }

    (bodies, (exact_a.index(), exact_b.index()))
}

fn touching_pairs(bodies: &Arena<Body>) -> BTreeSet<(usize, usize)> {
    let mut narrowphase = NarrowPhase::new(9.82, false);
    let materials = MaterialTable::default();
    let mut out = NarrowphaseOutput::default();
    let all: Vec<(BodyId, &Body)> = bodies.iter().collect();
    let mut touching = BTreeSet::new();
    for (i, &(id_a, a)) in all.iter().enumerate() {
        for &(id_b, b) in &all[i + 1..] {
            if !needs_broadphase_collision(a, b) {
                continue;
            }
            let (first, second) = if id_a.index() < id_b.index() {
                ((id_a, a), (id_b, b))
            } else {
                ((id_b, b), (id_a, a))
            };
            if narrowphase.collide_bodies(first, second, &materials, &mut out) {
                touching.insert((first.0.index(), second.0.index()));
            }
        }
    }
    touching
}

#[test]
fn broadphase_pairs_cover_every_touching_pair() {
    for seed in 0..3 {
        let (bodies, exact) = contact_scene(seed);
        let touching = touching_pairs(&bodies);
        assert!(touching.contains(&exact), "seed {seed}: exact touch missed by narrowphase");
        assert!(touching.len() > 10, "seed {seed}: only {} touching pairs", touching.len());

        for volume in [BoundingVolume::Sphere, BoundingVolume::Aabb] {
            let naive = pair_set(&mut NaiveBroadphase, &bodies, volume);
            let missing: Vec<_> = touching.difference(&naive).collect();
            assert!(missing.is_empty(), "seed {seed}, naive {volume:?} missed {missing:?}");
            for axis in [SweepAxis::X, SweepAxis::Y, SweepAxis::Z, SweepAxis::Auto] {
                let mut sap = SweepAndPrune::new(axis);
                let found = pair_set(&mut sap, &bodies, volume);
                let missing: Vec<_> = touching.difference(&found).collect();
                assert!(
                    missing.is_empty(),
                    "seed {seed}, {axis:?} {volume:?} missed {missing:?}"
                );
            }
        }
    }
}
