use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::error::ShapeError;
use super::types::Transform;

/// Axis-aligned bounding box used for shape bounds and BVH nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn radius(&self) -> f32 {
        self.extent().length()
    }

    /// Touching boxes count as overlapping.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// Bounds of this box after moving it by `transform`.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        let center = transform.point_to_world(self.center());
        let extent = self.extent();
        let m = glam::Mat3::from_quat(transform.rotation);
        let world_extent = Vec3::new(
            m.row(0).abs().dot(extent),
            m.row(1).abs().dot(extent),
            m.row(2).abs().dot(extent),
        );
        Aabb::new(center - world_extent, center + world_extent)
    }

    /// Slab test of the segment `origin + t * direction`, `t` in `[0, max_t]`.
    pub fn intersects_ray(&self, origin: Vec3, direction: Vec3, max_t: f32) -> bool {
        let mut t_min = 0.0f32;
        let mut t_max = max_t;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-12 {
                if o < self.min[axis] || o > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (self.min[axis] - o) * inv;
            let mut t2 = (self.max[axis] - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Node of a triangle BVH. Leaves reference `count` entries of the
/// triangle order starting at `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshBvhNode {
    pub bounds: Aabb,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub start: usize,
    pub count: usize,
}

impl MeshBvhNode {
    fn is_leaf(&self) -> bool {
        self.left.is_none()
    }
}

const LEAF_TRIANGLES: usize = 4;

/// Bounding volume hierarchy over the triangles of a [`Trimesh`], split
/// along the longest axis of the centroid bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshBvh {
    pub nodes: Vec<MeshBvhNode>,
    order: Vec<usize>,
}

impl MeshBvh {
    fn build(triangle_bounds: &[Aabb]) -> Self {
        let mut bvh = MeshBvh {
            nodes: Vec::new(),
            order: (0..triangle_bounds.len()).collect(),
        };
        if !triangle_bounds.is_empty() {
            bvh.build_node(triangle_bounds, 0, triangle_bounds.len());
        }
        bvh
    }

    fn build_node(&mut self, tri_bounds: &[Aabb], start: usize, count: usize) -> usize {
        let slice = &mut self.order[start..start + count];
        let bounds = slice
            .iter()
            .fold(Aabb::empty(), |acc, &t| acc.union(&tri_bounds[t]));

        let node_index = self.nodes.len();
        self.nodes.push(MeshBvhNode {
            bounds,
            left: None,
            right: None,
            start,
            count,
        });
        if count <= LEAF_TRIANGLES {
            return node_index;
        }

        let mut centroids = Aabb::empty();
        for &t in slice.iter() {
            centroids.extend(tri_bounds[t].center());
        }
        let size = centroids.max - centroids.min;
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        slice.sort_by(|&a, &b| {
            tri_bounds[a].center()[axis].total_cmp(&tri_bounds[b].center()[axis])
        });

        let half = count / 2;
        let left = self.build_node(tri_bounds, start, half);
        let right = self.build_node(tri_bounds, start + half, count - half);
        let node = &mut self.nodes[node_index];
        node.left = Some(left);
        node.right = Some(right);
        node_index
    }

    /// Collects every triangle whose bounds overlap `query` into `out`.
    pub fn query_aabb(&self, query: &Aabb, out: &mut Vec<usize>) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bounds.overlaps(query) {
                continue;
            }
            match (node.left, node.right) {
                (Some(l), Some(r)) => {
                    stack.push(l);
                    stack.push(r);
                }
                _ => out.extend_from_slice(&self.order[node.start..node.start + node.count]),
            }
        }
    }

    /// Collects every triangle whose bounds the segment may cross into `out`.
    pub fn query_ray(&self, origin: Vec3, direction: Vec3, max_t: f32, out: &mut Vec<usize>) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bounds.intersects_ray(origin, direction, max_t) {
                continue;
            }
            if node.is_leaf() {
                out.extend_from_slice(&self.order[node.start..node.start + node.count]);
            } else {
                stack.extend(node.left);
                stack.extend(node.right);
            }
        }
    }
}

/// Static triangle soup with a spatial index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trimesh {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
    bounds: Aabb,
    bvh: MeshBvh,
}

impl Trimesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Result<Self, ShapeError> {
        MeshBuilder::new(vertices, indices).build()
    }

    pub fn builder(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> MeshBuilder {
        MeshBuilder::new(vertices, indices)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.indices[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Unit normal of a counter-clockwise triangle.
    pub fn triangle_normal(&self, index: usize) -> Vec3 {
        let [a, b, c] = self.triangle(index);
        (b - a).cross(c - a).normalize_or_zero()
    }

    pub fn local_aabb(&self) -> Aabb {
        self.bounds
    }

    pub fn bvh(&self) -> &MeshBvh {
        &self.bvh
    }

    /// Triangles whose bounds overlap a local-space box.
    pub fn triangles_in_aabb(&self, query: &Aabb, out: &mut Vec<usize>) {
        self.bvh.query_aabb(query, out);
    }

    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.length_squared())
            .fold(0.0, f32::max)
            .sqrt()
    }

    /// Volume of the local bounding box.
    pub fn volume(&self) -> f32 {
        let size = self.bounds.extent() * 2.0;
        size.x * size.y * size.z
    }
}

/// Cooks triangle meshes from raw vertex/index buffers.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Merges vertices that fall into the same `epsilon` grid cell.
    pub fn weld_vertices(mut self, epsilon: f32) -> Self {
        if epsilon <= 0.0 || self.vertices.is_empty() {
            return self;
        }

        let inv = 1.0 / epsilon;
        let mut map: HashMap<(i32, i32, i32), u32> = HashMap::new();
        let mut welded: Vec<Vec3> = Vec::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.vertices.len());

        for v in &self.vertices {
            let key = (
                (v.x * inv).round() as i32,
                (v.y * inv).round() as i32,
                (v.z * inv).round() as i32,
            );
            let index = *map.entry(key).or_insert_with(|| {
                welded.push(*v);
                (welded.len() - 1) as u32
            });
            remap.push(index);
        }

        for tri in &mut self.indices {
            for corner in tri.iter_mut() {
                if let Some(&mapped) = remap.get(*corner as usize) {
                    *corner = mapped;
                }
            }
        }

        self.vertices = welded;
        self
    }

    pub fn build(self) -> Result<Trimesh, ShapeError> {
        if self.vertices.len() < 3 {
            return Err(ShapeError::TooFewVertices {
                required: 3,
                actual: self.vertices.len(),
            });
        }
        if let Some(index) = self.vertices.iter().position(|v| !v.is_finite()) {
            return Err(ShapeError::NonFiniteVertex { index });
        }
        let len = self.vertices.len();
        for (face, tri) in self.indices.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&i| i as usize >= len) {
                return Err(ShapeError::VertexOutOfRange {
                    face,
                    vertex: vertex as usize,
                    len,
                });
            }
        }

        let triangle_bounds: Vec<Aabb> = self
            .indices
            .iter()
            .map(|tri| {
                Aabb::from_points(&[
                    self.vertices[tri[0] as usize],
                    self.vertices[tri[1] as usize],
                    self.vertices[tri[2] as usize],
                ])
            })
            .collect();
        let bvh = MeshBvh::build(&triangle_bounds);
        let bounds = Aabb::from_points(&self.vertices);
        log::trace!(
            "built trimesh: {} vertices, {} triangles, {} bvh nodes",
            self.vertices.len(),
            self.indices.len(),
            bvh.nodes.len()
        );

        Ok(Trimesh {
            vertices: self.vertices,
            indices: self.indices,
            bounds,
            bvh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Trimesh {
        let mut vertices = Vec::new();
        for i in 0..=n {
            for j in 0..=n {
                vertices.push(Vec3::new(i as f32, 0.0, j as f32));
            }
        }
        let mut indices = Vec::new();
        let stride = (n + 1) as u32;
        for i in 0..n as u32 {
            for j in 0..n as u32 {
                let a = i * stride + j;
                indices.push([a, a + 1, a + stride]);
                indices.push([a + 1, a + stride + 1, a + stride]);
            }
        }
        Trimesh::new(vertices, indices).unwrap()
    }

    #[test]
    fn bvh_query_matches_brute_force() {
        let mesh = grid(8);
        let query = Aabb::new(Vec3::new(2.5, -1.0, 3.2), Vec3::new(4.1, 1.0, 4.0));
        let mut hits = Vec::new();
        mesh.triangles_in_aabb(&query, &mut hits);
        hits.sort_unstable();

        let mut expected: Vec<usize> = (0..mesh.triangle_count())
            .filter(|&t| Aabb::from_points(&mesh.triangle(t)).overlaps(&query))
            .collect();
        expected.sort_unstable();
        assert_eq!(hits, expected);
        assert!(!hits.is_empty());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let err = Trimesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 7]]).unwrap_err();
        assert!(matches!(err, ShapeError::VertexOutOfRange { vertex: 7, .. }));
    }

    #[test]
    fn welding_merges_duplicate_corners() {
        let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::X, Vec3::new(1.0, 0.0, 1.0), Vec3::Z];
        let mesh = Trimesh::builder(vertices, vec![[0, 1, 2], [3, 4, 5]])
            .weld_vertices(1e-4)
            .build()
            .unwrap();
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.indices()[1], [1, 3, 2]);
    }

    #[test]
    fn rotated_aabb_grows_to_fit() {
        let unit = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let t = Transform::new(Vec3::X, glam::Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let rotated = unit.transformed(&t);
        let s = std::f32::consts::SQRT_2;
        assert!((rotated.max.x - (1.0 + s)).abs() < 1e-5);
        assert!((rotated.max.y - 1.0).abs() < 1e-5);
    }
}
