use super::equation::{Equation, SolverBody, Spook};
use crate::config::{DEFAULT_SOLVER_ITERATIONS, DEFAULT_SOLVER_TOLERANCE};

/// Counters from the last solve.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolverStepMetrics {
    pub equations: usize,
    pub iterations: usize,
    /// Sum of |delta lambda| in the final iteration.
    pub residual: f32,
}

/// Projected Gauss-Seidel solver over SPOOK-regularised equations.
#[derive(Debug, Clone)]
pub struct GsSolver {
    pub iterations: u32,
    pub tolerance: f32,
    rhs: Vec<f32>,
    inv_c: Vec<f32>,
    lambda: Vec<f32>,
    eps: Vec<f32>,
}

impl Default for GsSolver {
    fn default() -> Self {
        Self::new(DEFAULT_SOLVER_ITERATIONS, DEFAULT_SOLVER_TOLERANCE)
    }
}

impl GsSolver {
    pub fn new(iterations: u32, tolerance: f32) -> Self {
        Self {
            iterations,
            tolerance,
            rhs: Vec::new(),
            inv_c: Vec::new(),
            lambda: Vec::new(),
            eps: Vec::new(),
        }
    }

    /// Solves `equations` in order for timestep `h`, accumulating velocity
    /// corrections into each body's `vlambda`/`wlambda`, then applies them
    /// to the body velocities.
    ///
    /// Stops when the squared sum of |delta lambda| over one sweep drops
    /// below `tolerance²` or after `iterations` sweeps.
    pub fn solve(
        &mut self,
        h: f32,
        equations: &mut [Equation],
        bodies: &mut [SolverBody],
    ) -> SolverStepMetrics {
        let mut metrics = SolverStepMetrics {
            equations: equations.len(),
            ..SolverStepMetrics::default()
        };

        for body in bodies.iter_mut() {
            body.vlambda = glam::Vec3::ZERO;
            body.wlambda = glam::Vec3::ZERO;
        }
        if equations.is_empty() {
            return metrics;
        }

        let n = equations.len();
        self.rhs.clear();
        self.inv_c.clear();
        self.eps.clear();
        self.lambda.clear();
        self.lambda.resize(n, 0.0);

        for eq in equations.iter() {
            let spook = Spook::new(eq.stiffness, eq.relaxation, h);
            let c = eq.compute_c(bodies, spook.eps);
            self.rhs.push(eq.compute_b(bodies, &spook, h));
            self.inv_c.push(if c > 0.0 { 1.0 / c } else { 0.0 });
            self.eps.push(spook.eps);
        }

        let tolerance_squared = self.tolerance * self.tolerance;
        for iteration in 0..self.iterations {
            let mut delta_total = 0.0f32;
            for (i, eq) in equations.iter().enumerate() {
                if !eq.enabled {
                    continue;
                }
                let lambda = self.lambda[i];
                let gw_lambda = eq.compute_gw_lambda(bodies);
                let mut delta = self.inv_c[i] * (self.rhs[i] - gw_lambda - self.eps[i] * lambda);

                if lambda + delta < eq.min_force {
                    delta = eq.min_force - lambda;
                } else if lambda + delta > eq.max_force {
                    delta = eq.max_force - lambda;
                }
                self.lambda[i] += delta;
                delta_total += delta.abs();

                eq.add_to_lambda(bodies, delta);
            }

            metrics.iterations = iteration as usize + 1;
            metrics.residual = delta_total;
            if delta_total * delta_total < tolerance_squared {
                break;
            }
        }

        for body in bodies.iter_mut() {
            body.velocity += body.vlambda * body.linear_factor;
            body.angular_velocity += body.wlambda * body.angular_factor;
        }

        let inv_h = 1.0 / h;
        for (eq, lambda) in equations.iter_mut().zip(&self.lambda) {
            eq.multiplier = lambda * inv_h;
        }

        log::trace!(
            "gs solver: {} equations, {} iterations, residual {:e}",
            metrics.equations,
            metrics.iterations,
            metrics.residual
        );
        metrics
    }
}
