use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::convex::ConvexPolyhedron;
use super::error::ShapeError;
use super::heightfield::Heightfield;
use super::mesh::{Aabb, Trimesh};
use super::types::{MaterialId, Transform};
use crate::config::PLANE_CONTACT_SKIN;
use crate::utils::math::box_inertia;

/// Shape kinds in dispatch order: collision routines are always called with
/// the lower kind first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere,
    Plane,
    Box,
    ConvexPolyhedron,
    Heightfield,
    Particle,
    Cylinder,
    Trimesh,
}

/// Geometry of a shape in its local frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeGeometry {
    Sphere {
        radius: f32,
    },
    /// Infinite plane through the origin with normal +Z.
    Plane,
    Box {
        half_extents: Vec3,
        hull: ConvexPolyhedron,
    },
    ConvexPolyhedron(ConvexPolyhedron),
    Heightfield(Heightfield),
    /// Point mass without extent.
    Particle,
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        hull: ConvexPolyhedron,
    },
    Trimesh(Trimesh),
}

/// Group/mask pair; two shapes interact only if each one's group is in the
/// other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub group: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group: 1,
            mask: u32::MAX,
        }
    }
}

impl CollisionFilter {
    pub fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    pub fn accepts(&self, other: &CollisionFilter) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

/// Collision geometry plus per-shape collision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    geometry: ShapeGeometry,
    bounding_radius: f32,
    pub material: Option<MaterialId>,
    pub filter: CollisionFilter,
    /// When false, contacts are detected and reported but never resolved.
    pub collision_response: bool,
}

impl Shape {
    fn from_geometry(geometry: ShapeGeometry) -> Self {
        let bounding_radius = match &geometry {
            ShapeGeometry::Sphere { radius } => *radius,
            ShapeGeometry::Plane => f32::MAX,
            ShapeGeometry::Box { half_extents, .. } => half_extents.length(),
            ShapeGeometry::ConvexPolyhedron(hull) => hull.bounding_radius(),
            ShapeGeometry::Heightfield(hf) => hf.bounding_radius(),
            ShapeGeometry::Particle => 0.0,
            ShapeGeometry::Cylinder { hull, .. } => hull.bounding_radius(),
            ShapeGeometry::Trimesh(mesh) => mesh.bounding_radius(),
        };
        Self {
            geometry,
            bounding_radius,
            material: None,
            filter: CollisionFilter::default(),
            collision_response: true,
        }
    }

    pub fn sphere(radius: f32) -> Result<Self, ShapeError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ShapeError::InvalidDimension {
                what: "sphere radius",
                value: radius,
            });
        }
        Ok(Self::from_geometry(ShapeGeometry::Sphere { radius }))
    }

    pub fn plane() -> Self {
        Self::from_geometry(ShapeGeometry::Plane)
    }

    pub fn particle() -> Self {
        Self::from_geometry(ShapeGeometry::Particle)
    }

    pub fn cuboid(half_extents: Vec3) -> Result<Self, ShapeError> {
        let hull = ConvexPolyhedron::cuboid(half_extents)?;
        Ok(Self::from_geometry(ShapeGeometry::Box { half_extents, hull }))
    }

    pub fn convex(hull: ConvexPolyhedron) -> Self {
        Self::from_geometry(ShapeGeometry::ConvexPolyhedron(hull))
    }

    pub fn cylinder(
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        segments: usize,
    ) -> Result<Self, ShapeError> {
        let hull = ConvexPolyhedron::cylinder(radius_top, radius_bottom, height, segments)?;
        Ok(Self::from_geometry(ShapeGeometry::Cylinder {
            radius_top,
            radius_bottom,
            height,
            hull,
        }))
    }

    pub fn heightfield(heightfield: Heightfield) -> Self {
        Self::from_geometry(ShapeGeometry::Heightfield(heightfield))
    }

    pub fn trimesh(mesh: Trimesh) -> Self {
        Self::from_geometry(ShapeGeometry::Trimesh(mesh))
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_filter(mut self, group: u32, mask: u32) -> Self {
        self.filter = CollisionFilter::new(group, mask);
        self
    }

    pub fn with_collision_response(mut self, enabled: bool) -> Self {
        self.collision_response = enabled;
        self
    }

    pub fn geometry(&self) -> &ShapeGeometry {
        &self.geometry
    }

    pub fn kind(&self) -> ShapeKind {
        match self.geometry {
            ShapeGeometry::Sphere { .. } => ShapeKind::Sphere,
            ShapeGeometry::Plane => ShapeKind::Plane,
            ShapeGeometry::Box { .. } => ShapeKind::Box,
            ShapeGeometry::ConvexPolyhedron(_) => ShapeKind::ConvexPolyhedron,
            ShapeGeometry::Heightfield(_) => ShapeKind::Heightfield,
            ShapeGeometry::Particle => ShapeKind::Particle,
            ShapeGeometry::Cylinder { .. } => ShapeKind::Cylinder,
            ShapeGeometry::Trimesh(_) => ShapeKind::Trimesh,
        }
    }

    /// Radius of a sphere around the shape origin enclosing the geometry.
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Polyhedral view of boxes, cylinders and convex hulls.
    pub fn as_convex(&self) -> Option<&ConvexPolyhedron> {
        match &self.geometry {
            ShapeGeometry::Box { hull, .. }
            | ShapeGeometry::Cylinder { hull, .. }
            | ShapeGeometry::ConvexPolyhedron(hull) => Some(hull),
            _ => None,
        }
    }

    pub fn volume(&self) -> f32 {
        match &self.geometry {
            ShapeGeometry::Sphere { radius } => 4.0 / 3.0 * std::f32::consts::PI * radius.powi(3),
            ShapeGeometry::Box { half_extents, .. } => {
                8.0 * half_extents.x * half_extents.y * half_extents.z
            }
            ShapeGeometry::ConvexPolyhedron(hull) | ShapeGeometry::Cylinder { hull, .. } => {
                hull.volume()
            }
            ShapeGeometry::Trimesh(mesh) => mesh.volume(),
            ShapeGeometry::Plane | ShapeGeometry::Heightfield(_) | ShapeGeometry::Particle => 0.0,
        }
    }

    /// Diagonal inertia for `mass` about the shape origin.
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        match &self.geometry {
            ShapeGeometry::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            ShapeGeometry::Box { half_extents, .. } => box_inertia(*half_extents, mass),
            ShapeGeometry::ConvexPolyhedron(hull) | ShapeGeometry::Cylinder { hull, .. } => {
                box_inertia(hull.local_aabb().extent(), mass)
            }
            ShapeGeometry::Trimesh(mesh) => box_inertia(mesh.local_aabb().extent(), mass),
            ShapeGeometry::Plane | ShapeGeometry::Heightfield(_) | ShapeGeometry::Particle => {
                Vec3::ZERO
            }
        }
    }

    /// World-space bounds when placed at `transform`.
    pub fn aabb(&self, transform: &Transform) -> Aabb {
        match &self.geometry {
            ShapeGeometry::Sphere { radius } => Aabb::new(
                transform.position - Vec3::splat(*radius),
                transform.position + Vec3::splat(*radius),
            ),
            ShapeGeometry::Particle => Aabb::new(transform.position, transform.position),
            ShapeGeometry::Plane => plane_aabb(transform),
            ShapeGeometry::Box { half_extents, .. } => {
                Aabb::new(-*half_extents, *half_extents).transformed(transform)
            }
            ShapeGeometry::ConvexPolyhedron(hull) | ShapeGeometry::Cylinder { hull, .. } => {
                let mut bounds = Aabb::empty();
                for v in hull.vertices() {
                    bounds.extend(transform.point_to_world(*v));
                }
                bounds
            }
            ShapeGeometry::Heightfield(hf) => hf.local_aabb().transformed(transform),
            ShapeGeometry::Trimesh(mesh) => mesh.local_aabb().transformed(transform),
        }
    }
}

/// Unbounded except along an axis-aligned normal, where the plane caps one
/// side just past its contact skin.
fn plane_aabb(transform: &Transform) -> Aabb {
    let mut min = Vec3::splat(-f32::MAX);
    let mut max = Vec3::splat(f32::MAX);
    let normal = transform.vector_to_world(Vec3::Z);
    let p = transform.position;
    for axis in 0..3 {
        let others_zero = (0..3)
            .filter(|&k| k != axis)
            .all(|k| normal[k].abs() < 1e-6);
        if !others_zero {
            continue;
        }
        if normal[axis] > 0.0 {
            max[axis] = p[axis] + PLANE_CONTACT_SKIN;
        } else if normal[axis] < 0.0 {
            min[axis] = p[axis] - PLANE_CONTACT_SKIN;
        }
    }
    Aabb::new(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn kinds_are_ordered_for_dispatch() {
        assert!(ShapeKind::Sphere < ShapeKind::Plane);
        assert!(ShapeKind::Box < ShapeKind::ConvexPolyhedron);
        assert!(ShapeKind::Heightfield < ShapeKind::Particle);
        assert!(ShapeKind::Cylinder < ShapeKind::Trimesh);
    }

    #[test]
    fn bounding_radius_is_eager() {
        let b = Shape::cuboid(Vec3::new(1.0, 2.0, 2.0)).unwrap();
        assert!((b.bounding_radius() - 3.0).abs() < 1e-6);
        assert_eq!(Shape::plane().bounding_radius(), f32::MAX);
        assert_eq!(Shape::particle().bounding_radius(), 0.0);
    }

    #[test]
    fn ground_plane_aabb_caps_the_top() {
        let t = Transform::new(Vec3::new(0.0, -1.0, 0.0), Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));
        let aabb = Shape::plane().aabb(&t);
        assert!((aabb.max.y - (PLANE_CONTACT_SKIN - 1.0)).abs() < 1e-6);
        assert_eq!(aabb.min.y, -f32::MAX);
        assert_eq!(aabb.max.x, f32::MAX);
    }

    #[test]
    fn filters_must_accept_each_other() {
        let a = CollisionFilter::new(1, 2);
        let b = CollisionFilter::new(2, 1);
        let c = CollisionFilter::new(2, 4);
        assert!(a.accepts(&b));
        assert!(!a.accepts(&c));
    }

    #[test]
    fn non_positive_radius_fails() {
        assert!(Shape::sphere(0.0).is_err());
        assert!(Shape::sphere(f32::NAN).is_err());
    }
}
