//! Ray casting against bodies and their shapes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::{
    convex::ConvexPolyhedron,
    heightfield::Heightfield,
    mesh::{Aabb, Trimesh},
    rigidbody::Body,
    shape::{CollisionFilter, Shape, ShapeGeometry},
    types::Transform,
};
use crate::utils::{allocator::BodyId, math::ray_triangle};

/// Which hits a cast reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RaycastMode {
    /// Only the nearest hit.
    #[default]
    Closest,
    /// The first hit found; stops searching afterwards.
    Any,
    /// Every hit, in no particular order.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaycastOptions {
    pub mode: RaycastMode,
    pub filter: CollisionFilter,
    /// Ignore surfaces whose normal faces along the ray.
    pub skip_backfaces: bool,
    /// Ignore bodies and shapes with collision response turned off.
    pub check_collision_response: bool,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            mode: RaycastMode::Closest,
            filter: CollisionFilter::default(),
            skip_backfaces: false,
            check_collision_response: true,
        }
    }
}

impl RaycastOptions {
    pub fn with_mode(mut self, mode: RaycastMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_filter(mut self, group: u32, mask: u32) -> Self {
        self.filter = CollisionFilter::new(group, mask);
        self
    }

    pub fn with_skip_backfaces(mut self, skip: bool) -> Self {
        self.skip_backfaces = skip;
        self
    }

    pub fn with_check_collision_response(mut self, check: bool) -> Self {
        self.check_collision_response = check;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub body: BodyId,
    /// Index of the hit shape within the body.
    pub shape: usize,
    pub point: Vec3,
    pub normal: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
    /// `distance` divided by the ray length.
    pub fraction: f32,
}

/// Segment from `from` to `to`.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub from: Vec3,
    pub to: Vec3,
    direction: Vec3,
    length: f32,
}

impl Ray {
    pub fn new(from: Vec3, to: Vec3) -> Self {
        let delta = to - from;
        let length = delta.length();
        Self {
            from,
            to,
            direction: delta.normalize_or_zero(),
            length,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&[self.from, self.to])
    }

    pub fn is_degenerate(&self) -> bool {
        self.length <= f32::EPSILON
    }

    /// Distance from `point` to the closest point on the segment.
    fn distance_to(&self, point: Vec3) -> f32 {
        let t = (point - self.from).dot(self.direction).clamp(0.0, self.length);
        (self.from + self.direction * t).distance(point)
    }

    /// Casts against the candidate bodies, honouring filters and the mode.
    pub fn cast<'a>(
        &self,
        candidates: impl IntoIterator<Item = (BodyId, &'a Body)>,
        options: &RaycastOptions,
    ) -> Vec<RaycastHit> {
        let mut hits = Vec::new();
        if self.is_degenerate() {
            return hits;
        }

        let mut closest: Option<RaycastHit> = None;
        let mut found = Vec::new();
        for (id, body) in candidates {
            if !options.filter.accepts(&body.filter) {
                continue;
            }
            if options.check_collision_response && !body.collision_response {
                continue;
            }
            for (index, placed) in body.shapes().iter().enumerate() {
                let shape = &placed.shape;
                if !options.filter.accepts(&shape.filter) {
                    continue;
                }
                if options.check_collision_response && !shape.collision_response {
                    continue;
                }
                let transform = body.shape_transform(index);
                if self.distance_to(transform.position) > shape.bounding_radius() {
                    continue;
                }

                found.clear();
                self.intersect_shape(shape, &transform, options.skip_backfaces, &mut found);
                for &(distance, normal) in &found {
                    let hit = RaycastHit {
                        body: id,
                        shape: index,
                        point: self.from + self.direction * distance,
                        normal,
                        distance,
                        fraction: distance / self.length,
                    };
                    match options.mode {
                        RaycastMode::Any => return vec![hit],
                        RaycastMode::All => hits.push(hit),
                        RaycastMode::Closest => {
                            if closest.map_or(true, |c| distance < c.distance) {
                                closest = Some(hit);
                            }
                        }
                    }
                }
            }
        }

        if let Some(hit) = closest {
            hits.push(hit);
        }
        hits
    }

    /// Pushes `(distance, world normal)` for each crossing of the shape.
    pub fn intersect_shape(
        &self,
        shape: &Shape,
        transform: &Transform,
        skip_backfaces: bool,
        out: &mut Vec<(f32, Vec3)>,
    ) {
        match shape.geometry() {
            ShapeGeometry::Sphere { radius } => self.intersect_sphere(transform.position, *radius, out),
            ShapeGeometry::Plane => self.intersect_plane(transform, skip_backfaces, out),
            ShapeGeometry::Box { hull, .. }
            | ShapeGeometry::ConvexPolyhedron(hull)
            | ShapeGeometry::Cylinder { hull, .. } => {
                self.intersect_convex(hull, transform, skip_backfaces, out)
            }
            ShapeGeometry::Heightfield(hf) => self.intersect_heightfield(hf, transform, skip_backfaces, out),
            ShapeGeometry::Trimesh(mesh) => self.intersect_trimesh(mesh, transform, skip_backfaces, out),
            ShapeGeometry::Particle => {}
        }
    }

    fn intersect_sphere(&self, center: Vec3, radius: f32, out: &mut Vec<(f32, Vec3)>) {
        let m = self.from - center;
        let b = m.dot(self.direction);
        let c = m.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return;
        }
        let root = discriminant.sqrt();
        for t in [-b - root, -b + root] {
            if (0.0..=self.length).contains(&t) {
                let point = self.from + self.direction * t;
                out.push((t, (point - center).normalize_or_zero()));
            }
            if root == 0.0 {
                break;
            }
        }
    }

    fn intersect_plane(&self, transform: &Transform, skip_backfaces: bool, out: &mut Vec<(f32, Vec3)>) {
        let normal = transform.vector_to_world(Vec3::Z);
        let along = normal.dot(self.direction);
        if along.abs() < f32::EPSILON || (skip_backfaces && along > 0.0) {
            return;
        }
        let from_height = normal.dot(self.from - transform.position);
        let to_height = normal.dot(self.to - transform.position);
        if from_height * to_height > 0.0 {
            return;
        }
        let t = -from_height / along;
        if (0.0..=self.length).contains(&t) {
            out.push((t, normal));
        }
    }

    fn intersect_convex(
        &self,
        hull: &ConvexPolyhedron,
        transform: &Transform,
        skip_backfaces: bool,
        out: &mut Vec<(f32, Vec3)>,
    ) {
        let from = transform.point_to_local(self.from);
        let direction = transform.vector_to_local(self.direction);
        for (f, face) in hull.faces().iter().enumerate() {
            let normal = hull.face_normals()[f];
            let along = normal.dot(direction);
            if along.abs() < f32::EPSILON || (skip_backfaces && along > 0.0) {
                continue;
            }
            let first = hull.vertices()[face[0]];
            for k in 1..face.len() - 1 {
                let b = hull.vertices()[face[k]];
                let c = hull.vertices()[face[k + 1]];
                if let Some((t, _)) = ray_triangle(from, direction, self.length, first, b, c) {
                    out.push((t, transform.vector_to_world(normal)));
                    break;
                }
            }
        }
    }

    fn intersect_heightfield(
        &self,
        hf: &Heightfield,
        transform: &Transform,
        skip_backfaces: bool,
        out: &mut Vec<(f32, Vec3)>,
    ) {
        let from = transform.point_to_local(self.from);
        let to = transform.point_to_local(self.to);
        let direction = transform.vector_to_local(self.direction);
        let (xs, ys) = hf.cell_range(&Aabb::from_points(&[from, to]));
        for i in xs {
            for j in ys.clone() {
                for upper in [false, true] {
                    let [a, b, c] = hf.triangle(i, j, upper);
                    if let Some((t, normal)) = ray_triangle(from, direction, self.length, a, b, c) {
                        if skip_backfaces && normal.dot(direction) > 0.0 {
                            continue;
                        }
                        out.push((t, transform.vector_to_world(normal)));
                    }
                }
            }
        }
    }

    fn intersect_trimesh(
        &self,
        mesh: &Trimesh,
        transform: &Transform,
        skip_backfaces: bool,
        out: &mut Vec<(f32, Vec3)>,
    ) {
        let from = transform.point_to_local(self.from);
        let direction = transform.vector_to_local(self.direction);
        let mut triangles = Vec::new();
        mesh.bvh().query_ray(from, direction, self.length, &mut triangles);
        for index in triangles {
            let [a, b, c] = mesh.triangle(index);
            if let Some((t, normal)) = ray_triangle(from, direction, self.length, a, b, c) {
                if skip_backfaces && normal.dot(direction) > 0.0 {
                    continue;
                }
                out.push((t, transform.vector_to_world(normal)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    fn hits_for(shape: &Shape, transform: Transform, ray: Ray, skip_backfaces: bool) -> Vec<(f32, Vec3)> {
        let mut out = Vec::new();
        ray.intersect_shape(shape, &transform, skip_backfaces, &mut out);
        out
    }

    #[test]
    fn sphere_reports_entry_and_exit() {
        let shape = Shape::sphere(1.0).unwrap();
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0));
        let mut hits = hits_for(&shape, Transform::default(), ray, false);
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].0, 4.0, epsilon = 1e-5);
        assert!(hits[0].1.abs_diff_eq(Vec3::NEG_X, 1e-5));
        assert_relative_eq!(hits[1].0, 6.0, epsilon = 1e-5);
    }

    #[test]
    fn ray_stopping_short_misses() {
        let shape = Shape::sphere(1.0).unwrap();
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(-2.0, 0.0, 0.0));
        assert!(hits_for(&shape, Transform::default(), ray, false).is_empty());
    }

    #[test]
    fn box_front_face_is_hit() {
        let shape = Shape::cuboid(Vec3::ONE).unwrap();
        let ray = Ray::new(Vec3::new(0.2, 10.0, 0.3), Vec3::new(0.2, -10.0, 0.3));
        let hits = hits_for(&shape, Transform::default(), ray, true);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].0, 9.0, epsilon = 1e-4);
        assert!(hits[0].1.abs_diff_eq(Vec3::Y, 1e-5));

        let both = hits_for(&shape, Transform::default(), ray, false);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn rotated_plane_faces_up() {
        let shape = Shape::plane();
        let ground = Transform::new(Vec3::ZERO, Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));
        let down = Ray::new(Vec3::new(3.0, 2.0, 1.0), Vec3::new(3.0, -2.0, 1.0));
        let hits = hits_for(&shape, ground, down, true);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].0, 2.0, epsilon = 1e-5);
        assert!(hits[0].1.abs_diff_eq(Vec3::Y, 1e-5));

        let up = Ray::new(Vec3::new(3.0, -2.0, 1.0), Vec3::new(3.0, 2.0, 1.0));
        assert!(hits_for(&shape, ground, up, true).is_empty());
        assert_eq!(hits_for(&shape, ground, up, false).len(), 1);
    }

    #[test]
    fn flat_heightfield_is_hit_from_above() {
        let hf = Heightfield::new(vec![vec![0.0; 4]; 4], 1.0).unwrap();
        let shape = Shape::heightfield(hf);
        let ray = Ray::new(Vec3::new(1.5, 1.2, 5.0), Vec3::new(1.5, 1.2, -5.0));
        let hits = hits_for(&shape, Transform::default(), ray, true);
        assert!(!hits.is_empty());
        assert_relative_eq!(hits[0].0, 5.0, epsilon = 1e-4);
        assert!(hits[0].1.abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn trimesh_triangle_is_hit() {
        let mesh = Trimesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let shape = Shape::trimesh(mesh);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::new(0.2, 0.2, -1.0));
        let hits = hits_for(&shape, Transform::default(), ray, false);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].0, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn closest_mode_picks_nearest_body() {
        let near = Body::new(0.0)
            .with_shape(Shape::sphere(0.5).unwrap())
            .with_position(Vec3::new(2.0, 0.0, 0.0));
        let far = Body::new(0.0)
            .with_shape(Shape::sphere(0.5).unwrap())
            .with_position(Vec3::new(6.0, 0.0, 0.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let candidates = [(BodyId::from_index(1), &far), (BodyId::from_index(0), &near)];

        let closest = ray.cast(candidates, &RaycastOptions::default());
        assert_eq!(closest.len(), 1);
        assert_eq!(closest[0].body, BodyId::from_index(0));
        assert_relative_eq!(closest[0].distance, 1.5, epsilon = 1e-5);
        assert_relative_eq!(closest[0].fraction, 0.15, epsilon = 1e-5);

        let all = ray.cast(candidates, &RaycastOptions::default().with_mode(RaycastMode::All));
        assert_eq!(all.len(), 4);

        let any = ray.cast(candidates, &RaycastOptions::default().with_mode(RaycastMode::Any));
        assert_eq!(any.len(), 1);
    }

    #[test]
    fn filtered_bodies_are_ignored() {
        let body = Body::new(0.0)
            .with_shape(Shape::sphere(0.5).unwrap())
            .with_collision_filter(2, u32::MAX)
            .with_position(Vec3::new(2.0, 0.0, 0.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let options = RaycastOptions::default().with_filter(1, 1);
        assert!(ray.cast([(BodyId::from_index(0), &body)], &options).is_empty());
    }
}
