use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::rigidbody::Body;
use crate::dynamics::equation::{Equation, EquationKind, Jacobian};
use crate::utils::allocator::BodyId;

/// Handle to a constraint owned by a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintId(pub(crate) u32);

/// Persistent user constraints between two bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Keeps the body centres `distance` apart.
    Distance { distance: f32 },
    /// Pins a body-local point of A to a body-local point of B.
    PointToPoint { pivot_a: Vec3, pivot_b: Vec3 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub kind: ConstraintKind,
    pub max_force: f32,
    /// When false the two bodies never generate contacts with each other.
    pub collide_connected: bool,
}

impl Constraint {
    pub fn distance(body_a: BodyId, body_b: BodyId, distance: f32, max_force: f32) -> Self {
        Self {
            body_a,
            body_b,
            kind: ConstraintKind::Distance { distance },
            max_force,
            collide_connected: true,
        }
    }

    pub fn point_to_point(
        body_a: BodyId,
        pivot_a: Vec3,
        body_b: BodyId,
        pivot_b: Vec3,
        max_force: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            kind: ConstraintKind::PointToPoint { pivot_a, pivot_b },
            max_force,
            collide_connected: true,
        }
    }

    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    pub fn involves(&self, a: BodyId, b: BodyId) -> bool {
        (self.body_a == a && self.body_b == b) || (self.body_a == b && self.body_b == a)
    }

    /// Appends this constraint's rows for the current body poses.
    /// `slot_a`/`slot_b` index the solver body arena.
    pub fn push_equations(
        &self,
        a: &Body,
        b: &Body,
        slot_a: usize,
        slot_b: usize,
        out: &mut Vec<Equation>,
    ) {
        let max = self.max_force;
        match self.kind {
            ConstraintKind::Distance { distance } => {
                let delta = b.position - a.position;
                let normal = delta.try_normalize().unwrap_or(Vec3::Y);
                let half = distance * 0.5;
                let ri = normal * half;
                let rj = normal * -half;
                let violation = normal.dot(b.position + rj - a.position - ri);
                out.push(
                    Equation::new(EquationKind::Constraint, slot_a, slot_b, Jacobian::along(normal, ri, rj))
                        .with_violation(violation)
                        .with_bounds(-max, max),
                );
            }
            ConstraintKind::PointToPoint { pivot_a, pivot_b } => {
                let ri = a.orientation * pivot_a;
                let rj = b.orientation * pivot_b;
                let gap = b.position + rj - a.position - ri;
                for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
                    out.push(
                        Equation::new(EquationKind::Constraint, slot_a, slot_b, Jacobian::along(axis, ri, rj))
                            .with_violation(axis.dot(gap))
                            .with_bounds(-max, max),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_violation_is_length_error() {
        let a = Body::new(1.0);
        let b = Body::new(1.0).with_position(Vec3::new(3.0, 0.0, 0.0));
        let c = Constraint::distance(BodyId::from_index(0), BodyId::from_index(1), 2.0, 1e6);
        let mut eqs = Vec::new();
        c.push_equations(&a, &b, 0, 1, &mut eqs);
        assert_eq!(eqs.len(), 1);
        assert_relative_eq!(eqs[0].violation, 1.0, epsilon = 1e-6);
        assert_relative_eq!(eqs[0].min_force, -1e6);
    }

    #[test]
    fn point_to_point_yields_three_rows() {
        let a = Body::new(1.0);
        let b = Body::new(1.0).with_position(Vec3::new(0.0, -2.0, 0.0));
        let c = Constraint::point_to_point(
            BodyId::from_index(0),
            Vec3::new(0.0, -1.0, 0.0),
            BodyId::from_index(1),
            Vec3::new(0.0, 1.0, 0.0),
            1e6,
        );
        let mut eqs = Vec::new();
        c.push_equations(&a, &b, 0, 1, &mut eqs);
        assert_eq!(eqs.len(), 3);
        for eq in &eqs {
            assert_relative_eq!(eq.violation, 0.0, epsilon = 1e-6);
        }
        assert!(c.involves(BodyId::from_index(1), BodyId::from_index(0)));
    }
}
