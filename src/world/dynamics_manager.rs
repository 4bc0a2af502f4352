use crate::collision::contact::{ContactPoint, FrictionPoint};
use crate::config::{WorldConfig, DEFAULT_CONTACT_MAX_FORCE};
use crate::core::{
    constraints::{Constraint, ConstraintId},
    rigidbody::{Body, BodyType},
};
use crate::dynamics::{
    equation::{Equation, EquationKind, Jacobian, SolverBody},
    integrator::Integrator,
    solver::{GsSolver, SolverStepMetrics},
};
use crate::utils::allocator::Arena;

/// Equation assembly, solving and integration of a world.
#[derive(Debug, Default)]
pub struct DynamicsManager {
    pub solver: GsSolver,
    pub integrator: Integrator,
    pub equations: Vec<Equation>,
    solver_bodies: Vec<SolverBody>,
}

/// Number of equations of each kind built for one step.
#[derive(Debug, Default, Clone, Copy)]
pub struct EquationCounts {
    pub contacts: usize,
    pub frictions: usize,
    pub constraints: usize,
}

impl DynamicsManager {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            solver: GsSolver::new(config.solver_iterations, config.solver_tolerance),
            integrator: Integrator::new(config.quat_normalization),
            equations: Vec::new(),
            solver_bodies: Vec::new(),
        }
    }

    /// Builds this step's equations: contacts first, then friction, then
    /// user constraints.
    pub fn build_equations(
        &mut self,
        bodies: &Arena<Body>,
        contacts: &[ContactPoint],
        frictions: &[FrictionPoint],
        constraints: &[(ConstraintId, Constraint)],
    ) -> EquationCounts {
        self.equations.clear();
        let mut counts = EquationCounts::default();

        for c in contacts {
            let (Some(a), Some(b)) = (bodies.get(c.body_a), bodies.get(c.body_b)) else {
                continue;
            };
            let mut eq = Equation::new(
                EquationKind::Contact,
                c.body_a.index(),
                c.body_b.index(),
                Jacobian::along(c.normal, c.ri, c.rj),
            )
            .with_violation(c.violation(a, b))
            .with_restitution(c.restitution)
            .with_spook(c.stiffness, c.relaxation)
            .with_bounds(0.0, DEFAULT_CONTACT_MAX_FORCE);
            eq.enabled = c.enabled;
            self.equations.push(eq);
            counts.contacts += 1;
        }

        for f in frictions {
            let mut eq = Equation::new(
                EquationKind::Friction,
                f.body_a.index(),
                f.body_b.index(),
                Jacobian::along(f.tangent, f.ri, f.rj),
            )
            .with_spook(f.stiffness, f.relaxation)
            .with_bounds(-f.slip_force, f.slip_force);
            eq.enabled = f.enabled;
            self.equations.push(eq);
            counts.frictions += 1;
        }

        for (_, constraint) in constraints {
            let (Some(a), Some(b)) = (bodies.get(constraint.body_a), bodies.get(constraint.body_b)) else {
                continue;
            };
            let before = self.equations.len();
            constraint.push_equations(
                a,
                b,
                constraint.body_a.index(),
                constraint.body_b.index(),
                &mut self.equations,
            );
            counts.constraints += self.equations.len() - before;
        }

        counts
    }

    /// Solves the built equations and writes the corrected velocities back
    /// to the dynamic bodies.
    pub fn solve(&mut self, bodies: &mut Arena<Body>, dt: f32) -> SolverStepMetrics {
        self.solver_bodies.clear();
        self.solver_bodies
            .resize(bodies.capacity(), SolverBody::default());
        for (id, body) in bodies.iter() {
            self.solver_bodies[id.index()] = SolverBody::from_body(body);
        }

        let metrics = self
            .solver
            .solve(dt, &mut self.equations, &mut self.solver_bodies);

        for (id, body) in bodies.iter_mut() {
            if body.body_type != BodyType::Dynamic || body.is_sleeping() {
                continue;
            }
            let solved = &self.solver_bodies[id.index()];
            body.velocity = solved.velocity;
            body.angular_velocity = solved.angular_velocity;
        }
        metrics
    }
}
