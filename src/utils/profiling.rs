use std::time::Duration;

/// Timing and counters for the most recent fixed step.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfiler {
    pub broadphase_time: Duration,
    pub narrowphase_time: Duration,
    pub solver_time: Duration,
    pub integrator_time: Duration,
    pub total_time: Duration,

    pub body_count: usize,
    pub candidate_pairs: usize,
    pub contact_count: usize,
    pub friction_count: usize,
    pub constraint_equations: usize,
    pub solver_iterations: usize,
}

impl StepProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fraction of the total step spent in `phase`, in percent.
    pub fn share(&self, phase: Duration) -> f32 {
        let total = self.total_time.as_secs_f32();
        if total <= 0.0 {
            0.0
        } else {
            phase.as_secs_f32() / total * 100.0
        }
    }

    /// Emits a one-step summary through the `log` facade at debug level.
    pub fn report(&self) {
        if self.total_time.is_zero() {
            return;
        }

        log::debug!(
            "step: {:.3} ms | bodies {} pairs {} contacts {} friction {} constraint eqs {} | solver iterations {}",
            self.total_time.as_secs_f32() * 1000.0,
            self.body_count,
            self.candidate_pairs,
            self.contact_count,
            self.friction_count,
            self.constraint_equations,
            self.solver_iterations,
        );
        log::debug!(
            "  broadphase {:.1}% narrowphase {:.1}% solver {:.1}% integrator {:.1}%",
            self.share(self.broadphase_time),
            self.share(self.narrowphase_time),
            self.share(self.solver_time),
            self.share(self.integrator_time),
        );
    }
}
