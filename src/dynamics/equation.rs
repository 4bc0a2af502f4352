use glam::{Mat3, Vec3};

use crate::core::rigidbody::{Body, BodyType, SleepState};

/// Dense per-body scratch state used while solving one step.
#[derive(Debug, Clone, Copy)]
pub struct SolverBody {
    pub inv_mass: f32,
    pub inv_inertia_world: Mat3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub force: Vec3,
    pub torque: Vec3,
    pub linear_factor: Vec3,
    pub angular_factor: Vec3,
    pub vlambda: Vec3,
    pub wlambda: Vec3,
}

impl Default for SolverBody {
    fn default() -> Self {
        Self {
            inv_mass: 0.0,
            inv_inertia_world: Mat3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
            vlambda: Vec3::ZERO,
            wlambda: Vec3::ZERO,
        }
    }
}

impl SolverBody {
    /// Sleeping and non-dynamic bodies enter the solve with infinite mass.
    pub fn from_body(body: &Body) -> Self {
        let solvable =
            body.body_type == BodyType::Dynamic && body.sleep_state != SleepState::Sleeping;
        Self {
            inv_mass: if solvable { body.inv_mass() } else { 0.0 },
            inv_inertia_world: if solvable {
                body.inv_inertia_world()
            } else {
                Mat3::ZERO
            },
            velocity: body.velocity,
            angular_velocity: body.angular_velocity,
            force: body.force,
            torque: body.torque,
            linear_factor: body.linear_factor,
            angular_factor: body.angular_factor,
            vlambda: Vec3::ZERO,
            wlambda: Vec3::ZERO,
        }
    }
}

/// Spatial and rotational Jacobian rows for both bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jacobian {
    pub linear_a: Vec3,
    pub angular_a: Vec3,
    pub linear_b: Vec3,
    pub angular_b: Vec3,
}

impl Jacobian {
    /// Rows pushing the bodies apart along `direction` at the offsets `ri`, `rj`.
    pub fn along(direction: Vec3, ri: Vec3, rj: Vec3) -> Self {
        Self {
            linear_a: -direction,
            angular_a: -ri.cross(direction),
            linear_b: direction,
            angular_b: rj.cross(direction),
        }
    }
}

/// SPOOK regularisation parameters for timestep `h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spook {
    pub a: f32,
    pub b: f32,
    pub eps: f32,
}

impl Spook {
    pub fn new(stiffness: f32, relaxation: f32, h: f32) -> Self {
        let d = relaxation;
        let k = stiffness;
        Self {
            a: 4.0 / (h * (1.0 + 4.0 * d)),
            b: (4.0 * d) / (1.0 + 4.0 * d),
            eps: 4.0 / (h * h * k * (1.0 + 4.0 * d)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationKind {
    /// Non-penetration; approaching rows with restitution target a rebound.
    Contact,
    Friction,
    /// Bilateral row contributed by a user constraint.
    Constraint,
}

/// One scalar velocity constraint between two solver bodies.
#[derive(Debug, Clone)]
pub struct Equation {
    pub kind: EquationKind,
    pub body_a: usize,
    pub body_b: usize,
    pub jacobian: Jacobian,
    /// Position error `g`; zero for friction.
    pub violation: f32,
    pub restitution: f32,
    pub min_force: f32,
    pub max_force: f32,
    pub stiffness: f32,
    pub relaxation: f32,
    pub enabled: bool,
    /// Solved force (`lambda / h`) after the last solve.
    pub multiplier: f32,
}

impl Equation {
    pub fn new(kind: EquationKind, body_a: usize, body_b: usize, jacobian: Jacobian) -> Self {
        Self {
            kind,
            body_a,
            body_b,
            jacobian,
            violation: 0.0,
            restitution: 0.0,
            min_force: -1e6,
            max_force: 1e6,
            stiffness: crate::config::DEFAULT_EQUATION_STIFFNESS,
            relaxation: crate::config::DEFAULT_EQUATION_RELAXATION,
            enabled: true,
            multiplier: 0.0,
        }
    }

    pub fn with_bounds(mut self, min_force: f32, max_force: f32) -> Self {
        self.min_force = min_force;
        self.max_force = max_force;
        self
    }

    pub fn with_spook(mut self, stiffness: f32, relaxation: f32) -> Self {
        self.stiffness = stiffness;
        self.relaxation = relaxation;
        self
    }

    pub fn with_violation(mut self, violation: f32) -> Self {
        self.violation = violation;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// `G W`, the relative velocity along the row before solving.
    pub(crate) fn compute_gw(&self, bodies: &[SolverBody]) -> f32 {
        let a = &bodies[self.body_a];
        let b = &bodies[self.body_b];
        let j = &self.jacobian;
        j.linear_a.dot(a.velocity)
            + j.linear_b.dot(b.velocity)
            + j.angular_a.dot(a.angular_velocity)
            + j.angular_b.dot(b.angular_velocity)
    }

    /// `G` applied to the velocity accumulated in this solve.
    pub(crate) fn compute_gw_lambda(&self, bodies: &[SolverBody]) -> f32 {
        let a = &bodies[self.body_a];
        let b = &bodies[self.body_b];
        let j = &self.jacobian;
        j.linear_a.dot(a.vlambda)
            + j.angular_a.dot(a.wlambda)
            + j.linear_b.dot(b.vlambda)
            + j.angular_b.dot(b.wlambda)
    }

    /// `G M^-1 f` for the external forces.
    pub(crate) fn compute_gimf(&self, bodies: &[SolverBody]) -> f32 {
        let a = &bodies[self.body_a];
        let b = &bodies[self.body_b];
        let j = &self.jacobian;
        j.linear_a.dot(a.force * a.inv_mass)
            + j.angular_a.dot(a.inv_inertia_world * a.torque)
            + j.linear_b.dot(b.force * b.inv_mass)
            + j.angular_b.dot(b.inv_inertia_world * b.torque)
    }

    /// `G M^-1 G^T + eps`.
    pub(crate) fn compute_c(&self, bodies: &[SolverBody], eps: f32) -> f32 {
        let a = &bodies[self.body_a];
        let b = &bodies[self.body_b];
        let j = &self.jacobian;
        a.inv_mass * j.linear_a.length_squared()
            + b.inv_mass * j.linear_b.length_squared()
            + j.angular_a.dot(a.inv_inertia_world * j.angular_a)
            + j.angular_b.dot(b.inv_inertia_world * j.angular_b)
            + eps
    }

    /// Right-hand side `B = -g a - G W b - h G M^-1 f`.
    ///
    /// An approaching contact with restitution `e` instead targets the
    /// rebound `-(1 + e) G W` when that separates faster than the SPOOK
    /// term, so penetration recovery never adds to the bounce.
    pub(crate) fn compute_b(&self, bodies: &[SolverBody], spook: &Spook, h: f32) -> f32 {
        let gw = self.compute_gw(bodies);
        let mut target = -self.violation * spook.a - gw * spook.b;
        if self.kind == EquationKind::Contact && self.restitution > 0.0 && gw < 0.0 {
            target = target.max(-(1.0 + self.restitution) * gw);
        }
        target - h * self.compute_gimf(bodies)
    }

    pub(crate) fn add_to_lambda(&self, bodies: &mut [SolverBody], delta: f32) {
        let j = self.jacobian;
        {
            let a = &mut bodies[self.body_a];
            a.vlambda += j.linear_a * (a.inv_mass * delta);
            a.wlambda += a.inv_inertia_world * (j.angular_a * delta);
        }
        let b = &mut bodies[self.body_b];
        b.vlambda += j.linear_b * (b.inv_mass * delta);
        b.wlambda += b.inv_inertia_world * (j.angular_b * delta);
    }
}
