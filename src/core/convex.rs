use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::error::ShapeError;
use super::mesh::Aabb;
use super::types::Transform;

/// Convex polyhedron given by vertices and counter-clockwise faces
/// (seen from outside).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvexPolyhedron {
    vertices: Vec<Vec3>,
    faces: Vec<Vec<usize>>,
    face_normals: Vec<Vec3>,
    unique_edges: Vec<Vec3>,
    unique_axes: Option<Vec<Vec3>>,
    bounding_radius: f32,
}

impl ConvexPolyhedron {
    /// Validates the input and computes outward face normals and unique edges.
    ///
    /// Faces wound the wrong way are flipped with a warning.
    pub fn new(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>) -> Result<Self, ShapeError> {
        if vertices.len() < 4 {
            return Err(ShapeError::TooFewVertices {
                required: 4,
                actual: vertices.len(),
            });
        }
        if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(ShapeError::NonFiniteVertex { index });
        }
        if faces.is_empty() {
            return Err(ShapeError::NoFaces);
        }
        for (face, indices) in faces.iter().enumerate() {
            if indices.len() < 3 {
                return Err(ShapeError::FaceTooSmall {
                    face,
                    count: indices.len(),
                });
            }
            if let Some(&vertex) = indices.iter().find(|&&i| i >= vertices.len()) {
                return Err(ShapeError::VertexOutOfRange {
                    face,
                    vertex,
                    len: vertices.len(),
                });
            }
        }

        let centroid = vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32;
        let mut faces = faces;
        let mut face_normals = Vec::with_capacity(faces.len());
        for (face, indices) in faces.iter_mut().enumerate() {
            let mut normal = newell_normal(&vertices, indices);
            if normal == Vec3::ZERO {
                return Err(ShapeError::DegenerateFace { face });
            }
            if normal.dot(vertices[indices[0]] - centroid) < 0.0 {
                log::warn!("convex face {face} points inwards; reversing its winding");
                indices.reverse();
                normal = -normal;
            }
            face_normals.push(normal);
        }

        let mut unique_edges: Vec<Vec3> = Vec::new();
        for indices in &faces {
            for k in 0..indices.len() {
                let a = vertices[indices[k]];
                let b = vertices[indices[(k + 1) % indices.len()]];
                let edge = (b - a).normalize_or_zero();
                if edge == Vec3::ZERO {
                    continue;
                }
                let seen = unique_edges
                    .iter()
                    .any(|e| e.abs_diff_eq(edge, 1e-6) || e.abs_diff_eq(-edge, 1e-6));
                if !seen {
                    unique_edges.push(edge);
                }
            }
        }

        let bounding_radius = vertices
            .iter()
            .map(|v| v.length_squared())
            .fold(0.0, f32::max)
            .sqrt();

        Ok(Self {
            vertices,
            faces,
            face_normals,
            unique_edges,
            unique_axes: None,
            bounding_radius,
        })
    }

    /// Box with the given half extents; only the three face axes are tested by SAT.
    pub fn cuboid(half_extents: Vec3) -> Result<Self, ShapeError> {
        for (what, value) in [
            ("half extent x", half_extents.x),
            ("half extent y", half_extents.y),
            ("half extent z", half_extents.z),
        ] {
            check_dimension(what, value)?;
        }
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let faces = vec![
            vec![3, 2, 1, 0], // -z
            vec![4, 5, 6, 7], // +z
            vec![5, 4, 0, 1], // -y
            vec![2, 3, 7, 6], // +y
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
        ];
        let mut hull = Self::new(vertices, faces)?;
        hull.unique_axes = Some(vec![Vec3::X, Vec3::Y, Vec3::Z]);
        Ok(hull)
    }

    /// Y-aligned cylinder (or truncated cone) approximated by `segments` sides.
    pub fn cylinder(
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        segments: usize,
    ) -> Result<Self, ShapeError> {
        check_dimension("top radius", radius_top)?;
        check_dimension("bottom radius", radius_bottom)?;
        check_dimension("height", height)?;
        if segments < 3 {
            return Err(ShapeError::TooFewSegments(segments));
        }

        let half = height * 0.5;
        let mut vertices = Vec::with_capacity(segments * 2);
        for i in 0..segments {
            let theta = std::f32::consts::TAU * i as f32 / segments as f32;
            let (sin, cos) = theta.sin_cos();
            vertices.push(Vec3::new(radius_bottom * cos, -half, radius_bottom * sin));
            vertices.push(Vec3::new(radius_top * cos, half, radius_top * sin));
        }

        let mut faces = Vec::with_capacity(segments + 2);
        for i in 0..segments {
            let next = (i + 1) % segments;
            faces.push(vec![2 * i, 2 * i + 1, 2 * next + 1, 2 * next]);
        }
        faces.push((0..segments).map(|i| 2 * i).collect());
        faces.push((0..segments).rev().map(|i| 2 * i + 1).collect());

        Self::new(vertices, faces)
    }

    /// Overrides the axes tested by SAT in place of the face normals.
    pub fn with_unique_axes(mut self, axes: Vec<Vec3>) -> Self {
        self.unique_axes = Some(axes.into_iter().map(|a| a.normalize_or_zero()).collect());
        self
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    pub fn face_normals(&self) -> &[Vec3] {
        &self.face_normals
    }

    pub fn unique_edges(&self) -> &[Vec3] {
        &self.unique_edges
    }

    pub fn unique_axes(&self) -> Option<&[Vec3]> {
        self.unique_axes.as_deref()
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn face_vertex(&self, face: usize, corner: usize) -> Vec3 {
        self.vertices[self.faces[face][corner]]
    }

    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Min and max of the world-space vertices projected on `axis`.
    pub fn project(&self, transform: &Transform, axis: Vec3) -> (f32, f32) {
        let local_axis = transform.vector_to_local(axis);
        let offset = transform.position.dot(axis);
        let (min, max) = self
            .vertices
            .iter()
            .map(|v| v.dot(local_axis))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            });
        (min + offset, max + offset)
    }

    /// True when the local point lies inside or on every face plane.
    pub fn contains_local_point(&self, p: Vec3) -> bool {
        self.face_normals
            .iter()
            .zip(&self.faces)
            .all(|(n, f)| n.dot(p - self.vertices[f[0]]) <= 0.0)
    }

    /// Signed volume via a fan of tetrahedra from the origin.
    pub fn volume(&self) -> f32 {
        let mut six_v = 0.0;
        for face in &self.faces {
            let a = self.vertices[face[0]];
            for k in 1..face.len() - 1 {
                let b = self.vertices[face[k]];
                let c = self.vertices[face[k + 1]];
                six_v += a.dot(b.cross(c));
            }
        }
        (six_v / 6.0).abs()
    }
}

fn check_dimension(what: &'static str, value: f32) -> Result<(), ShapeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ShapeError::InvalidDimension { what, value })
    }
}

/// Newell's method; robust for faces with collinear leading vertices.
fn newell_normal(vertices: &[Vec3], face: &[usize]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for k in 0..face.len() {
        let a = vertices[face[k]];
        let b = vertices[face[(k + 1) % face.len()]];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    if n.length_squared() < 1e-20 {
        Vec3::ZERO
    } else {
        n.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> ConvexPolyhedron {
        ConvexPolyhedron::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn box_normals_point_outwards() {
        let hull = ConvexPolyhedron::cuboid(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let expected = [
            Vec3::NEG_Z,
            Vec3::Z,
            Vec3::NEG_Y,
            Vec3::Y,
            Vec3::NEG_X,
            Vec3::X,
        ];
        for (n, e) in hull.face_normals().iter().zip(expected) {
            assert!(n.abs_diff_eq(e, 1e-6), "{n} != {e}");
        }
        assert_eq!(hull.unique_edges().len(), 3);
        assert!((hull.volume() - 48.0).abs() < 1e-4);
    }

    #[test]
    fn inward_faces_are_reoriented() {
        let flipped = ConvexPolyhedron::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![vec![0, 1, 2], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
        )
        .unwrap();
        assert!(flipped.face_normals()[0].abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(flipped.face_normals()[1].abs_diff_eq(Vec3::NEG_Y, 1e-6));
    }

    #[test]
    fn tetrahedron_has_six_unique_edges() {
        let tet = tetrahedron();
        assert_eq!(tet.unique_edges().len(), 6);
        assert!((tet.volume() - 1.0 / 6.0).abs() < 1e-6);
        assert!(tet.contains_local_point(Vec3::splat(0.1)));
        assert!(!tet.contains_local_point(Vec3::splat(0.5)));
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert!(matches!(
            ConvexPolyhedron::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 2]]),
            Err(ShapeError::TooFewVertices { .. })
        ));
        assert!(matches!(
            ConvexPolyhedron::new(
                vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
                vec![vec![0, 1, 9]]
            ),
            Err(ShapeError::VertexOutOfRange { vertex: 9, .. })
        ));
        assert!(matches!(
            ConvexPolyhedron::cuboid(Vec3::new(1.0, 0.0, 1.0)),
            Err(ShapeError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn cylinder_is_closed() {
        let cyl = ConvexPolyhedron::cylinder(1.0, 1.0, 2.0, 16).unwrap();
        assert_eq!(cyl.faces().len(), 18);
        let top = cyl.face_normals()[17];
        let bottom = cyl.face_normals()[16];
        assert!(top.abs_diff_eq(Vec3::Y, 1e-5));
        assert!(bottom.abs_diff_eq(Vec3::NEG_Y, 1e-5));
        for n in &cyl.face_normals()[..16] {
            assert!(n.y.abs() < 1e-5);
        }
    }

    #[test]
    fn projection_follows_transform() {
        let hull = ConvexPolyhedron::cuboid(Vec3::ONE).unwrap();
        let t = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));
        let (lo, hi) = hull.project(&t, Vec3::X);
        assert!((lo - 4.0).abs() < 1e-6);
        assert!((hi - 6.0).abs() < 1e-6);
    }
}
