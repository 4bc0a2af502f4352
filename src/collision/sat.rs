//! Separating axis test and contact clipping for convex polyhedra.

use glam::Vec3;

use super::clipping::{clip_polygon, Plane};
use crate::core::{convex::ConvexPolyhedron, types::Transform};
use crate::utils::math::almost_zero;

/// Deepest and shallowest accepted clip depths.
pub const CLIP_MIN_DEPTH: f32 = -100.0;
pub const CLIP_MAX_DEPTH: f32 = 100.0;

/// A convex hull placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct PlacedHull<'a> {
    pub hull: &'a ConvexPolyhedron,
    pub transform: Transform,
}

impl<'a> PlacedHull<'a> {
    pub fn new(hull: &'a ConvexPolyhedron, transform: Transform) -> Self {
        Self { hull, transform }
    }

    fn world_vertex(&self, index: usize) -> Vec3 {
        self.transform.point_to_world(self.hull.vertices()[index])
    }

    fn world_normal(&self, face: usize) -> Vec3 {
        self.transform.vector_to_world(self.hull.face_normals()[face])
    }

    /// Axes contributed by this hull: its unique axes if set, else face normals.
    fn test_axes(&self) -> Vec<Vec3> {
        match self.hull.unique_axes() {
            Some(axes) => axes
                .iter()
                .map(|a| self.transform.vector_to_world(*a))
                .collect(),
            None => (0..self.hull.faces().len())
                .map(|f| self.world_normal(f))
                .collect(),
        }
    }
}

/// Overlap depth of both hulls projected on `axis`, or `None` if separated.
pub fn overlap_on_axis(a: &PlacedHull<'_>, b: &PlacedHull<'_>, axis: Vec3) -> Option<f32> {
    let (min_a, max_a) = a.hull.project(&a.transform, axis);
    let (min_b, max_b) = b.hull.project(&b.transform, axis);
    if max_a < min_b || max_b < min_a {
        return None;
    }
    Some((max_a - min_b).min(max_b - min_a))
}

/// Minimum-overlap axis over face axes and edge cross products, oriented
/// from B towards A. `None` when a separating axis exists.
pub fn find_separating_axis(a: &PlacedHull<'_>, b: &PlacedHull<'_>) -> Option<Vec3> {
    let mut best_depth = f32::MAX;
    let mut best_axis = None;

    let mut consider = |axis: Vec3| -> bool {
        match overlap_on_axis(a, b, axis) {
            None => false,
            Some(depth) => {
                if depth < best_depth {
                    best_depth = depth;
                    best_axis = Some(axis);
                }
                true
            }
        }
    };

    for axis in a.test_axes().into_iter().chain(b.test_axes()) {
        if !consider(axis) {
            return None;
        }
    }

    for edge_a in a.hull.unique_edges() {
        let world_a = a.transform.vector_to_world(*edge_a);
        for edge_b in b.hull.unique_edges() {
            let world_b = b.transform.vector_to_world(*edge_b);
            let cross = world_a.cross(world_b);
            if almost_zero(cross) {
                continue;
            }
            if !consider(cross.normalize()) {
                return None;
            }
        }
    }

    let axis = best_axis?;
    let delta = b.transform.position - a.transform.position;
    Some(if delta.dot(axis) > 0.0 { -axis } else { axis })
}

/// One clipped contact: `point` lies on B, `normal` is A's reference face
/// normal and `depth` the signed distance below that face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPoint {
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
}

/// Clips B's incident face (most aligned with `separating_axis`) against A's
/// reference face (least aligned) and its side planes.
pub fn clip_against_hull(
    a: &PlacedHull<'_>,
    b: &PlacedHull<'_>,
    separating_axis: Vec3,
    min_depth: f32,
    max_depth: f32,
    out: &mut Vec<ClipPoint>,
) {
    let incident = (0..b.hull.faces().len()).max_by(|&i, &j| {
        b.world_normal(i)
            .dot(separating_axis)
            .total_cmp(&b.world_normal(j).dot(separating_axis))
    });
    let Some(incident) = incident else {
        return;
    };
    let incident_verts: Vec<Vec3> = b.hull.faces()[incident]
        .iter()
        .map(|&v| b.world_vertex(v))
        .collect();
    clip_face_against_hull(a, separating_axis, &incident_verts, min_depth, max_depth, out);
}

/// Clips a world-space polygon against the reference face of `a`.
pub fn clip_face_against_hull(
    a: &PlacedHull<'_>,
    separating_axis: Vec3,
    face_verts: &[Vec3],
    min_depth: f32,
    max_depth: f32,
    out: &mut Vec<ClipPoint>,
) {
    let reference = (0..a.hull.faces().len()).min_by(|&i, &j| {
        a.world_normal(i)
            .dot(separating_axis)
            .total_cmp(&a.world_normal(j).dot(separating_axis))
    });
    let Some(reference) = reference else {
        return;
    };

    let face = &a.hull.faces()[reference];
    let normal = a.world_normal(reference);
    let side_planes: Vec<Plane> = (0..face.len())
        .map(|e| {
            let start = a.world_vertex(face[e]);
            let end = a.world_vertex(face[(e + 1) % face.len()]);
            Plane::from_point_normal(start, (end - start).cross(normal))
        })
        .collect();

    let clipped = clip_polygon(face_verts, &side_planes);
    let plane_constant = -normal.dot(a.world_vertex(face[0]));
    for point in clipped {
        let depth = (normal.dot(point) + plane_constant).max(min_depth);
        if depth <= max_depth && depth <= 0.0 {
            out.push(ClipPoint {
                point,
                normal,
                depth,
            });
        }
    }
}
