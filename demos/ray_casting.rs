use cannonball::prelude::*;

fn main() {
    env_logger::init();

    let mut world = World::default();
    world.add_body(
        Body::new(0.0)
            .with_shape(Shape::plane())
            .with_orientation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
    );
    for i in 0..3 {
        world.add_body(
            Body::new(1.0)
                .with_shape(Shape::sphere(1.0).unwrap())
                .with_position(Vec3::new(0.0, 1.0, i as f32 * 3.0)),
        );
    }

    let from = Vec3::new(0.0, 1.0, -5.0);
    let to = Vec3::new(0.0, 1.0, 10.0);

    match world.raycast_closest(from, to, &RaycastOptions::default()) {
        Some(hit) => println!(
            "closest: body {:?} at {:.2} (normal {:.2})",
            hit.body, hit.point, hit.normal
        ),
        None => println!("closest: nothing"),
    }

    let mut hits = world.raycast(from, to, &RaycastOptions::default().with_mode(RaycastMode::All));
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    println!("ray crosses {} surfaces", hits.len());
    for hit in hits {
        println!("  {:?} at distance {:.2}", hit.body, hit.distance);
    }
}
