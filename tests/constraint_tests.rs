use cannonball::{Body, BodyId, Constraint, Shape, Vec3, World, WorldConfig, WorldEvent};

const DT: f32 = 1.0 / 60.0;

fn anchor(world: &mut World, position: Vec3) -> BodyId {
    world.add_body(
        Body::new(0.0)
            .with_shape(Shape::sphere(0.1).unwrap())
            .with_position(position),
    )
}

fn bob(world: &mut World, position: Vec3, radius: f32) -> BodyId {
    world.add_body(
        Body::new(1.0)
            .with_shape(Shape::sphere(radius).unwrap())
            .with_position(position),
    )
}

#[test]
fn distance_constraint_holds_a_swinging_bob() {
    let mut world = World::default();
    let top = anchor(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let ball = bob(&mut world, Vec3::new(2.0, 5.0, 0.0), 0.1);
    world.add_constraint(Constraint::distance(top, ball, 2.0, 1e6));

    let mut lowest = f32::MAX;
    for _ in 0..120 {
        world.step(DT);
        let position = world.body(ball).unwrap().position;
        let length = position.distance(Vec3::new(0.0, 5.0, 0.0));
        assert!((length - 2.0).abs() < 0.05, "length drifted to {length}");
        lowest = lowest.min(position.y);
    }
    assert!(lowest < 3.2, "bob never swung down, lowest y {lowest}");
}

#[test]
fn point_to_point_pins_the_pivot() {
    let mut world = World::default();
    let top = anchor(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let ball = bob(&mut world, Vec3::new(1.0, 5.0, 0.0), 0.2);
    world.add_constraint(Constraint::point_to_point(
        top,
        Vec3::ZERO,
        ball,
        Vec3::new(-1.0, 0.0, 0.0),
        1e6,
    ));

    let mut lowest = f32::MAX;
    for _ in 0..90 {
        world.step(DT);
        let body = world.body(ball).unwrap();
        let pivot = body.point_to_world(Vec3::new(-1.0, 0.0, 0.0));
        assert!(
            pivot.distance(Vec3::new(0.0, 5.0, 0.0)) < 0.1,
            "pivot wandered to {pivot}"
        );
        lowest = lowest.min(body.position.y);
    }
    assert!(lowest < 4.5);
}

#[test]
fn connected_bodies_can_ignore_each_other() {
    let config = WorldConfig::default().with_gravity(Vec3::ZERO);

    let mut world = World::new(config.clone());
    let a = bob(&mut world, Vec3::ZERO, 0.5);
    let b = bob(&mut world, Vec3::new(0.5, 0.0, 0.0), 0.5);
    world.add_constraint(Constraint::distance(a, b, 0.5, 1e6).with_collide_connected(false));
    world.step(DT);
    assert!(world.contacts().is_empty());
    assert!(!world
        .drain_events()
        .iter()
        .any(|e| matches!(e, WorldEvent::BeginContact { .. })));

    let mut world = World::new(config);
    let a = bob(&mut world, Vec3::ZERO, 0.5);
    let b = bob(&mut world, Vec3::new(0.5, 0.0, 0.0), 0.5);
    world.add_constraint(Constraint::distance(a, b, 0.5, 1e6));
    world.step(DT);
    assert!(!world.contacts().is_empty());
}

#[test]
fn constraints_can_be_removed_directly_or_with_their_bodies() {
    let mut world = World::default();
    let top = anchor(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let ball = bob(&mut world, Vec3::new(0.0, 3.0, 0.0), 0.1);

    let first = world.add_constraint(Constraint::distance(top, ball, 2.0, 1e6));
    assert!(world.constraint(first).is_some());
    assert!(world.remove_constraint(first).is_some());
    assert!(world.remove_constraint(first).is_none());

    let second = world.add_constraint(Constraint::distance(top, ball, 2.0, 1e6));
    assert_ne!(first, second);
    world.remove_body(ball);
    assert!(world.constraint(second).is_none());
    world.step(DT);
}

#[test]
fn max_force_limits_what_a_constraint_can_hold() {
    let mut world = World::default();
    let top = anchor(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let ball = bob(&mut world, Vec3::new(0.0, 3.0, 0.0), 0.1);
    // Bounds apply to the per-step impulse; holding the bob needs m * g * dt.
    world.add_constraint(Constraint::distance(top, ball, 2.0, 0.1));
    for _ in 0..60 {
        world.step(DT);
    }
    assert!(world.body(ball).unwrap().position.y < 2.5);
}
