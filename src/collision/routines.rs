//! Contact generation for each supported pair of shape kinds.
//!
//! Every routine writes world-space [`RawContact`]s whose normal points from
//! its first shape argument towards its second.

use glam::Vec3;

use super::contact::RawContact;
use super::sat::{clip_against_hull, find_separating_axis, PlacedHull, CLIP_MAX_DEPTH, CLIP_MIN_DEPTH};
use crate::config::PLANE_CONTACT_SKIN;
use crate::core::{
    heightfield::Heightfield,
    mesh::{Aabb, Trimesh},
    shape::{Shape, ShapeGeometry},
    types::Transform,
};
use crate::utils::math::closest_point_on_triangle;

/// Normal used when two centres coincide and no direction can be derived.
pub const FALLBACK_NORMAL: Vec3 = Vec3::Y;

/// A shape placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct ShapeInstance<'a> {
    pub shape: &'a Shape,
    pub transform: Transform,
}

impl<'a> ShapeInstance<'a> {
    pub fn new(shape: &'a Shape, transform: Transform) -> Self {
        Self { shape, transform }
    }

    fn hull(&self) -> Option<PlacedHull<'a>> {
        self.shape
            .as_convex()
            .map(|hull| PlacedHull::new(hull, self.transform))
    }
}

/// Runs the routine for the pair, lower [`ShapeKind`](crate::core::shape::ShapeKind)
/// first, and flips the results back into `a -> b` orientation when the
/// arguments were swapped. Returns false for unsupported pairs.
pub fn collide_shapes(a: ShapeInstance<'_>, b: ShapeInstance<'_>, out: &mut Vec<RawContact>) -> bool {
    if a.shape.kind() <= b.shape.kind() {
        collide_ordered(a, b, out)
    } else {
        let start = out.len();
        let supported = collide_ordered(b, a, out);
        flip_from(out, start);
        supported
    }
}

fn flip_from(out: &mut [RawContact], start: usize) {
    for c in &mut out[start..] {
        *c = c.flipped();
    }
}

fn collide_ordered(a: ShapeInstance<'_>, b: ShapeInstance<'_>, out: &mut Vec<RawContact>) -> bool {
    use ShapeGeometry as G;

    let pa = a.transform.position;
    let pb = b.transform.position;
    match (a.shape.geometry(), b.shape.geometry()) {
        (G::Sphere { radius: ra }, G::Sphere { radius: rb }) => sphere_sphere(pa, *ra, pb, *rb, out),
        (G::Sphere { radius }, G::Plane) => sphere_plane(pa, *radius, &b.transform, out),
        (G::Sphere { radius }, G::Heightfield(hf)) => {
            sphere_heightfield(pa, *radius, hf, &b.transform, out)
        }
        (G::Sphere { radius }, G::Particle) => sphere_particle(pa, *radius, pb, out),
        (G::Sphere { radius }, G::Trimesh(mesh)) => sphere_trimesh(pa, *radius, mesh, &b.transform, out),
        (G::Sphere { radius }, _) => match b.hull() {
            Some(hull) => sphere_convex(pa, *radius, &hull, out),
            None => return false,
        },

        (G::Plane, G::Particle) => plane_particle(&a.transform, pb, out),
        (G::Plane, G::Trimesh(mesh)) => plane_trimesh(&a.transform, mesh, &b.transform, out),
        (G::Plane, _) => match b.hull() {
            Some(hull) => plane_convex(&a.transform, &hull, out),
            None => return false,
        },

        (G::Heightfield(hf), G::Particle) => heightfield_particle(hf, &a.transform, pb, out),
        (G::Heightfield(hf), _) => match b.hull() {
            Some(hull) => {
                let start = out.len();
                convex_heightfield(&hull, hf, &a.transform, out);
                flip_from(out, start);
            }
            None => return false,
        },
        (G::Particle, _) => match b.hull() {
            Some(hull) => {
                let start = out.len();
                convex_particle(&hull, pa, out);
                flip_from(out, start);
            }
            None => return false,
        },

        (_, G::Heightfield(hf)) => match a.hull() {
            Some(hull) => convex_heightfield(&hull, hf, &b.transform, out),
            None => return false,
        },
        (_, G::Particle) => match a.hull() {
            Some(hull) => convex_particle(&hull, pb, out),
            None => return false,
        },
        _ => match (a.hull(), b.hull()) {
            (Some(ha), Some(hb)) => convex_convex(&ha, &hb, out),
            _ => return false,
        },
    }
    true
}

pub fn sphere_sphere(ca: Vec3, ra: f32, cb: Vec3, rb: f32, out: &mut Vec<RawContact>) {
    let delta = cb - ca;
    let reach = ra + rb;
    if delta.length_squared() > reach * reach {
        return;
    }
    let n = delta.try_normalize().unwrap_or(FALLBACK_NORMAL);
    out.push(RawContact::new(n, ca + n * ra, cb - n * rb));
}

/// Plane normal is local +Z.
pub fn sphere_plane(center: Vec3, radius: f32, plane: &Transform, out: &mut Vec<RawContact>) {
    let n = plane.vector_to_world(Vec3::Z);
    let dist = n.dot(center - plane.position);
    if dist > radius {
        return;
    }
    out.push(RawContact::new(-n, center - n * radius, center - n * dist));
}

pub fn sphere_particle(center: Vec3, radius: f32, particle: Vec3, out: &mut Vec<RawContact>) {
    let delta = particle - center;
    if delta.length_squared() > radius * radius {
        return;
    }
    let n = delta.try_normalize().unwrap_or(FALLBACK_NORMAL);
    out.push(RawContact::new(n, center + n * radius, particle));
}

/// Tests hull vertices, then faces (centre projected inside the face), then
/// face edges; a centre inside the hull is pushed out through the nearest face.
pub fn sphere_convex(center: Vec3, radius: f32, hull: &PlacedHull<'_>, out: &mut Vec<RawContact>) {
    let r2 = radius * radius;
    let t = &hull.transform;

    for v in hull.hull.vertices() {
        let w = t.point_to_world(*v);
        let delta = w - center;
        if delta.length_squared() < r2 {
            let n = delta.try_normalize().unwrap_or(FALLBACK_NORMAL);
            out.push(RawContact::new(n, center + n * radius, w));
            return;
        }
    }

    let mut inside = true;
    let mut nearest: Option<(f32, Vec3)> = None;
    let mut corners = Vec::new();
    for (face, normal) in hull.hull.faces().iter().zip(hull.hull.face_normals()) {
        let n = t.vector_to_world(*normal);
        let v0 = t.point_to_world(hull.hull.vertices()[face[0]]);
        let dist = n.dot(center - v0);
        if nearest.map_or(true, |(d, _)| dist > d) {
            nearest = Some((dist, n));
        }
        if dist <= 0.0 {
            continue;
        }
        inside = false;
        if dist >= radius {
            continue;
        }

        corners.clear();
        corners.extend(face.iter().map(|&i| t.point_to_world(hull.hull.vertices()[i])));
        let projected = center - n * dist;
        if point_in_polygon(&corners, n, projected) {
            out.push(RawContact::new(-n, center - n * radius, projected));
            return;
        }
        for k in 0..corners.len() {
            let p = closest_point_on_segment(center, corners[k], corners[(k + 1) % corners.len()]);
            let delta = p - center;
            if delta.length_squared() < r2 {
                let n = delta.try_normalize().unwrap_or(FALLBACK_NORMAL);
                out.push(RawContact::new(n, center + n * radius, p));
                return;
            }
        }
    }

    if let (true, Some((dist, n))) = (inside, nearest) {
        out.push(RawContact::new(-n, center - n * radius, center - n * dist));
    }
}

/// Hull vertices below the plane, or above it by at most
/// [`PLANE_CONTACT_SKIN`]; those keep a contact with positive separation.
pub fn plane_convex(plane: &Transform, hull: &PlacedHull<'_>, out: &mut Vec<RawContact>) {
    let n = plane.vector_to_world(Vec3::Z);
    for v in hull.hull.vertices() {
        let w = hull.transform.point_to_world(*v);
        let dist = n.dot(w - plane.position);
        if dist <= PLANE_CONTACT_SKIN {
            out.push(RawContact::new(n, w - n * dist, w));
        }
    }
}

pub fn plane_particle(plane: &Transform, particle: Vec3, out: &mut Vec<RawContact>) {
    let n = plane.vector_to_world(Vec3::Z);
    let dist = n.dot(particle - plane.position);
    if dist <= 0.0 {
        out.push(RawContact::new(n, particle - n * dist, particle));
    }
}

pub fn convex_convex(a: &PlacedHull<'_>, b: &PlacedHull<'_>, out: &mut Vec<RawContact>) {
    let Some(axis) = find_separating_axis(a, b) else {
        return;
    };
    let mut clipped = Vec::new();
    clip_against_hull(a, b, axis, CLIP_MIN_DEPTH, CLIP_MAX_DEPTH, &mut clipped);
    for c in clipped {
        out.push(RawContact::new(-axis, c.point - c.normal * c.depth, c.point));
    }
}

/// Particle inside the hull, pushed out through the face of least penetration.
pub fn convex_particle(hull: &PlacedHull<'_>, particle: Vec3, out: &mut Vec<RawContact>) {
    let local = hull.transform.point_to_local(particle);
    if !hull.hull.contains_local_point(local) {
        return;
    }
    let best = hull
        .hull
        .faces()
        .iter()
        .zip(hull.hull.face_normals())
        .map(|(face, n)| (n.dot(local - hull.hull.vertices()[face[0]]), *n))
        .max_by(|x, y| x.0.total_cmp(&y.0));
    if let Some((dist, local_normal)) = best {
        let n = hull.transform.vector_to_world(local_normal);
        out.push(RawContact::new(n, particle - n * dist, particle));
    }
}

/// Visits the triangle pillars of every heightfield cell overlapping `local`.
fn for_each_pillar(
    hf: &Heightfield,
    hf_transform: &Transform,
    local: &Aabb,
    mut visit: impl FnMut(&PlacedHull<'_>),
) {
    let (xs, ys) = hf.cell_range(local);
    for i in xs {
        for j in ys.clone() {
            for upper in [false, true] {
                let Ok((pillar, offset)) = hf.pillar(i, j, upper) else {
                    continue;
                };
                let placed = PlacedHull::new(
                    &pillar,
                    Transform::new(hf_transform.point_to_world(offset), hf_transform.rotation),
                );
                visit(&placed);
            }
        }
    }
}

fn local_sphere_bounds(hf_transform: &Transform, center: Vec3, radius: f32) -> Aabb {
    let local = hf_transform.point_to_local(center);
    Aabb::new(local - Vec3::splat(radius), local + Vec3::splat(radius))
}

pub fn convex_heightfield(
    hull: &PlacedHull<'_>,
    hf: &Heightfield,
    hf_transform: &Transform,
    out: &mut Vec<RawContact>,
) {
    let radius = hull.hull.bounding_radius();
    let bounds = local_sphere_bounds(hf_transform, hull.transform.position, radius);
    for_each_pillar(hf, hf_transform, &bounds, |pillar| {
        let reach = radius + pillar.hull.bounding_radius();
        if pillar.transform.position.distance_squared(hull.transform.position) <= reach * reach {
            convex_convex(hull, pillar, out);
        }
    });
}

pub fn sphere_heightfield(
    center: Vec3,
    radius: f32,
    hf: &Heightfield,
    hf_transform: &Transform,
    out: &mut Vec<RawContact>,
) {
    let bounds = local_sphere_bounds(hf_transform, center, radius);
    for_each_pillar(hf, hf_transform, &bounds, |pillar| {
        sphere_convex(center, radius, pillar, out);
    });
}

pub fn heightfield_particle(
    hf: &Heightfield,
    hf_transform: &Transform,
    particle: Vec3,
    out: &mut Vec<RawContact>,
) {
    let bounds = local_sphere_bounds(hf_transform, particle, 0.0);
    let start = out.len();
    for_each_pillar(hf, hf_transform, &bounds, |pillar| {
        if out.len() == start {
            convex_particle(pillar, particle, out);
        }
    });
}

/// Closest point on each nearby triangle; near-identical points from shared
/// edges and vertices are reported once.
pub fn sphere_trimesh(
    center: Vec3,
    radius: f32,
    mesh: &Trimesh,
    mesh_transform: &Transform,
    out: &mut Vec<RawContact>,
) {
    let local = mesh_transform.point_to_local(center);
    let query = Aabb::new(local - Vec3::splat(radius), local + Vec3::splat(radius));
    let mut triangles = Vec::new();
    mesh.triangles_in_aabb(&query, &mut triangles);

    let start = out.len();
    for t in triangles {
        let [a, b, c] = mesh.triangle(t);
        let closest = closest_point_on_triangle(local, a, b, c);
        if closest.distance_squared(local) >= radius * radius {
            continue;
        }
        let point = mesh_transform.point_to_world(closest);
        if out[start..]
            .iter()
            .any(|e| e.point_b.distance_squared(point) < 1e-8)
        {
            continue;
        }
        let n = (point - center)
            .try_normalize()
            .unwrap_or_else(|| -mesh_transform.vector_to_world(mesh.triangle_normal(t)));
        out.push(RawContact::new(n, center + n * radius, point));
    }
}

pub fn plane_trimesh(
    plane: &Transform,
    mesh: &Trimesh,
    mesh_transform: &Transform,
    out: &mut Vec<RawContact>,
) {
    let n = plane.vector_to_world(Vec3::Z);
    for v in mesh.vertices() {
        let w = mesh_transform.point_to_world(*v);
        let dist = n.dot(w - plane.position);
        if dist <= 0.0 {
            out.push(RawContact::new(n, w - n * dist, w));
        }
    }
}

/// True when `p` (on the polygon's plane) lies inside the polygon or on its edges.
pub fn point_in_polygon(corners: &[Vec3], normal: Vec3, p: Vec3) -> bool {
    let mut positive = false;
    let mut negative = false;
    for k in 0..corners.len() {
        let a = corners[k];
        let b = corners[(k + 1) % corners.len()];
        let side = (b - a).cross(p - a).dot(normal);
        if side > 0.0 {
            positive = true;
        } else if side < 0.0 {
            negative = true;
        }
        if positive && negative {
            return false;
        }
    }
    true
}

pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::convex::ConvexPolyhedron;
    use approx::assert_relative_eq;
    use glam::Quat;

    fn ground() -> Transform {
        Transform::new(Vec3::ZERO, Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2))
    }

    #[test]
    fn touching_spheres_give_zero_depth() {
        let mut out = Vec::new();
        sphere_sphere(Vec3::ZERO, 1.0, Vec3::new(2.0, 0.0, 0.0), 1.0, &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].depth(), 0.0, epsilon = 1e-6);
        assert!(out[0].normal.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn coincident_spheres_use_fallback_normal() {
        let mut out = Vec::new();
        sphere_sphere(Vec3::ONE, 1.0, Vec3::ONE, 0.5, &mut out);
        assert_eq!(out[0].normal, FALLBACK_NORMAL);
        assert_relative_eq!(out[0].depth(), -1.5, epsilon = 1e-6);
    }

    #[test]
    fn sphere_resting_in_plane() {
        let mut out = Vec::new();
        sphere_plane(Vec3::new(0.0, 0.9, 0.0), 1.0, &ground(), &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].normal.abs_diff_eq(Vec3::NEG_Y, 1e-5));
        assert_relative_eq!(out[0].depth(), -0.1, epsilon = 1e-5);
    }

    #[test]
    fn sphere_over_box_face() {
        let hull = ConvexPolyhedron::cuboid(Vec3::ONE).unwrap();
        let placed = PlacedHull::new(&hull, Transform::default());
        let mut out = Vec::new();
        sphere_convex(Vec3::new(0.2, 1.4, 0.1), 0.5, &placed, &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].normal.abs_diff_eq(Vec3::NEG_Y, 1e-5));
        assert_relative_eq!(out[0].depth(), -0.1, epsilon = 1e-5);
    }

    #[test]
    fn sphere_near_box_edge() {
        let hull = ConvexPolyhedron::cuboid(Vec3::ONE).unwrap();
        let placed = PlacedHull::new(&hull, Transform::default());
        let mut out = Vec::new();
        sphere_convex(Vec3::new(1.3, 1.3, 0.0), 0.5, &placed, &mut out);
        assert_eq!(out.len(), 1);
        let expected = Vec3::new(-1.0, -1.0, 0.0).normalize();
        assert!(out[0].normal.abs_diff_eq(expected, 1e-5));
        assert!(out[0].point_b.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn sphere_centre_inside_box_is_pushed_out() {
        let hull = ConvexPolyhedron::cuboid(Vec3::ONE).unwrap();
        let placed = PlacedHull::new(&hull, Transform::default());
        let mut out = Vec::new();
        sphere_convex(Vec3::new(0.0, 0.0, 0.8), 0.1, &placed, &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].normal.abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!(out[0].depth() < 0.0);
    }

    #[test]
    fn box_on_plane_gives_four_contacts() {
        let shape = Shape::cuboid(Vec3::splat(0.5)).unwrap();
        let plane = Shape::plane();
        let mut out = Vec::new();
        let supported = collide_shapes(
            ShapeInstance::new(&shape, Transform::from_position(Vec3::new(0.0, 0.45, 0.0))),
            ShapeInstance::new(&plane, ground()),
            &mut out,
        );
        assert!(supported);
        assert_eq!(out.len(), 4);
        for c in &out {
            // box first, so the normal points from the box into the plane
            assert!(c.normal.abs_diff_eq(Vec3::NEG_Y, 1e-5));
            assert_relative_eq!(c.depth(), -0.05, epsilon = 1e-5);
        }
    }

    #[test]
    fn box_on_box_clips_to_overlap() {
        let lower = Shape::cuboid(Vec3::new(2.0, 0.5, 2.0)).unwrap();
        let upper = Shape::cuboid(Vec3::splat(0.5)).unwrap();
        let mut out = Vec::new();
        collide_shapes(
            ShapeInstance::new(&lower, Transform::default()),
            ShapeInstance::new(&upper, Transform::from_position(Vec3::new(0.3, 0.98, 0.0))),
            &mut out,
        );
        assert_eq!(out.len(), 4);
        for c in &out {
            assert!(c.normal.abs_diff_eq(Vec3::Y, 1e-5));
            assert_relative_eq!(c.depth(), -0.02, epsilon = 1e-4);
        }
    }

    #[test]
    fn hull_hovering_within_the_plane_skin_keeps_contacts() {
        let shape = Shape::cuboid(Vec3::splat(0.5)).unwrap();
        let plane = Shape::plane();
        let gap = PLANE_CONTACT_SKIN * 0.5;
        let mut out = Vec::new();
        collide_shapes(
            ShapeInstance::new(&plane, ground()),
            ShapeInstance::new(&shape, Transform::from_position(Vec3::new(0.0, 0.5 + gap, 0.0))),
            &mut out,
        );
        assert_eq!(out.len(), 4);
        for c in &out {
            assert!(c.normal.abs_diff_eq(Vec3::Y, 1e-5));
            assert_relative_eq!(c.depth(), gap, epsilon = 1e-5);
        }

        out.clear();
        collide_shapes(
            ShapeInstance::new(&plane, ground()),
            ShapeInstance::new(
                &shape,
                Transform::from_position(Vec3::new(0.0, 0.5 + 2.0 * PLANE_CONTACT_SKIN, 0.0)),
            ),
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn particle_inside_box() {
        let shape = Shape::cuboid(Vec3::ONE).unwrap();
        let particle = Shape::particle();
        let mut out = Vec::new();
        collide_shapes(
            ShapeInstance::new(&particle, Transform::from_position(Vec3::new(0.0, 0.9, 0.0))),
            ShapeInstance::new(&shape, Transform::default()),
            &mut out,
        );
        assert_eq!(out.len(), 1);
        // particle first: normal points from the particle into the box
        assert!(out[0].normal.abs_diff_eq(Vec3::NEG_Y, 1e-5));
        assert_relative_eq!(out[0].depth(), -0.1, epsilon = 1e-5);
    }

    #[test]
    fn sphere_on_flat_heightfield() {
        let hf = Heightfield::new(vec![vec![0.0; 4]; 4], 1.0).unwrap();
        let shape = Shape::heightfield(hf);
        let sphere = Shape::sphere(0.5).unwrap();
        // heightfield rotated so its +Z points up along world +Y
        let mut out = Vec::new();
        collide_shapes(
            ShapeInstance::new(&sphere, Transform::from_position(Vec3::new(1.3, 0.45, -1.3))),
            ShapeInstance::new(&shape, ground()),
            &mut out,
        );
        assert!(!out.is_empty());
        for c in &out {
            assert!(c.normal.abs_diff_eq(Vec3::NEG_Y, 1e-4), "{}", c.normal);
            assert_relative_eq!(c.depth(), -0.05, epsilon = 1e-4);
        }
    }

    #[test]
    fn sphere_on_trimesh_reports_one_point_per_location() {
        let mesh = Trimesh::new(
            vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 3, 2]],
        )
        .unwrap();
        let shape = Shape::trimesh(mesh);
        let sphere = Shape::sphere(0.5).unwrap();
        let mut out = Vec::new();
        // directly above the shared diagonal
        collide_shapes(
            ShapeInstance::new(&sphere, Transform::from_position(Vec3::new(0.0, 0.4, 0.0))),
            ShapeInstance::new(&shape, Transform::default()),
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert!(out[0].normal.abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn unsupported_pairs_report_false() {
        let plane = Shape::plane();
        let mut out = Vec::new();
        assert!(!collide_shapes(
            ShapeInstance::new(&plane, Transform::default()),
            ShapeInstance::new(&plane, Transform::default()),
            &mut out,
        ));
        assert!(out.is_empty());
    }
}
