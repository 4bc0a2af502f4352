use cannonball::config::{DEFAULT_MAX_SUB_STEPS, DEFAULT_TIME_STEP};
use cannonball::prelude::*;

fn tetrahedron() -> ConvexPolyhedron {
    let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
    let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]];
    match ConvexPolyhedron::new(vertices, faces) {
        Ok(hull) => hull,
        Err(err) => panic!("tetrahedron hull is invalid: {err}"),
    }
}

fn main() {
    env_logger::init();

    let mut world = World::new(WorldConfig::default().with_broadphase(BroadphaseKind::SweepAndPrune {
        axis: cannonball::SweepAxis::Auto,
    }));
    let bouncy = world.add_material(Material::new("bouncy").with_friction(0.2).with_restitution(0.4));
    world.add_body(
        Body::new(0.0)
            .with_shape(Shape::plane())
            .with_orientation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
    );

    let hull = tetrahedron();
    for i in 0..12 {
        let angle = i as f32 * 0.7;
        world.add_body(
            Body::new(1.0)
                .with_shape(Shape::convex(hull.clone()))
                .with_material(bouncy)
                .with_position(Vec3::new(angle.cos() * 2.0, 2.0 + i as f32 * 1.5, angle.sin() * 2.0))
                .with_orientation(Quat::from_rotation_y(angle) * Quat::from_rotation_x(0.3 * i as f32)),
        );
    }

    let mut frame = 0u32;
    while world.has_active_bodies() && frame < 1200 {
        // Pretend the host renders at a jittery ~50 Hz.
        let elapsed = if frame % 2 == 0 { 0.018 } else { 0.022 };
        world.step_accumulated(DEFAULT_TIME_STEP, elapsed, DEFAULT_MAX_SUB_STEPS);
        frame += 1;

        for event in world.drain_events() {
            match event {
                WorldEvent::Collide {
                    body_a,
                    body_b,
                    impact_speed,
                    ..
                } if impact_speed > 1.0 => {
                    println!("t={:.2}s {body_a:?} hit {body_b:?} at {impact_speed:.2} m/s", world.time())
                }
                WorldEvent::Sleep(body) => println!("t={:.2}s {body:?} fell asleep", world.time()),
                _ => {}
            }
        }
    }

    println!(
        "done after {} steps; last step took {:?}",
        world.step_count(),
        world.profile().total_time
    );
}
