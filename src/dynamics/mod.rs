//! Simulation dynamics: constraint equations, the Gauss-Seidel solver, integration and sleep.

pub mod equation;
pub mod integrator;
pub mod sleep;
pub mod solver;

pub use equation::{Equation, EquationKind, Jacobian, SolverBody, Spook};
pub use integrator::Integrator;
pub use sleep::SleepTransition;
pub use solver::{GsSolver, SolverStepMetrics};
