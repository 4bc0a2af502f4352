use glam::Vec3;

use crate::core::rigidbody::Body;
use crate::utils::allocator::BodyId;

/// Contact produced by a shape-pair routine, in world space.
///
/// `normal` points from the first shape towards the second; `point_a` lies on
/// the first shape's surface and `point_b` on the second's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawContact {
    pub normal: Vec3,
    pub point_a: Vec3,
    pub point_b: Vec3,
}

impl RawContact {
    pub fn new(normal: Vec3, point_a: Vec3, point_b: Vec3) -> Self {
        Self {
            normal,
            point_a,
            point_b,
        }
    }

    /// Same contact seen from the other shape.
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            point_a: self.point_b,
            point_b: self.point_a,
        }
    }

    /// Signed separation along the normal; negative while penetrating.
    pub fn depth(&self) -> f32 {
        self.normal.dot(self.point_b - self.point_a)
    }
}

/// Contact between two bodies, ready to become a non-penetration equation.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub shape_a: usize,
    pub shape_b: usize,
    /// Unit normal from body A towards body B.
    pub normal: Vec3,
    /// Contact point on A relative to A's centre (world frame).
    pub ri: Vec3,
    /// Contact point on B relative to B's centre (world frame).
    pub rj: Vec3,
    pub restitution: f32,
    pub friction: f32,
    pub stiffness: f32,
    pub relaxation: f32,
    /// False when collision response is disabled for the pair.
    pub enabled: bool,
}

impl ContactPoint {
    /// `g = n · (xj + rj - xi - ri)`.
    pub fn violation(&self, a: &Body, b: &Body) -> f32 {
        self.normal
            .dot(b.position + self.rj - a.position - self.ri)
    }

    pub fn world_point_a(&self, a: &Body) -> Vec3 {
        a.position + self.ri
    }

    pub fn world_point_b(&self, b: &Body) -> Vec3 {
        b.position + self.rj
    }

    /// Relative velocity of the contact points along the normal; negative
    /// when the bodies approach each other.
    pub fn impact_velocity_along_normal(&self, a: &Body, b: &Body) -> f32 {
        let va = a.velocity_at_world_point(a.position + self.ri);
        let vb = b.velocity_at_world_point(b.position + self.rj);
        self.normal.dot(vb - va)
    }
}

/// Tangential friction row between two bodies.
#[derive(Debug, Clone, Copy)]
pub struct FrictionPoint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub tangent: Vec3,
    pub ri: Vec3,
    pub rj: Vec3,
    /// Force bound `mu * |g| * reduced_mass`.
    pub slip_force: f32,
    pub stiffness: f32,
    pub relaxation: f32,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipping_preserves_depth() {
        let c = RawContact::new(Vec3::Y, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.8, 0.0));
        assert!((c.depth() + 0.2).abs() < 1e-6);
        assert!((c.flipped().depth() - c.depth()).abs() < 1e-6);
    }
}
