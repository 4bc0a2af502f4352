//! Default constants and the serialisable world configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::ContactMaterialParams;

/// Default gravity vector applied in the world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.82, 0.0];

/// Default fixed integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Gauss-Seidel iteration cap per step.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Convergence tolerance of the Gauss-Seidel solver.
pub const DEFAULT_SOLVER_TOLERANCE: f32 = 1e-7;

/// Upper bound on fixed steps performed by one accumulated `step` call.
pub const DEFAULT_MAX_SUB_STEPS: u32 = 10;

/// SPOOK stiffness used for contact and friction equations.
pub const DEFAULT_EQUATION_STIFFNESS: f32 = 1e7;

/// SPOOK relaxation (number of steps to stabilise) for contact and friction equations.
pub const DEFAULT_EQUATION_RELAXATION: f32 = 3.0;

/// Default friction coefficient of the world contact material.
pub const DEFAULT_FRICTION: f32 = 0.3;

/// Default restitution of the world contact material.
pub const DEFAULT_RESTITUTION: f32 = 0.3;

/// Default damping applied to linear velocity (fraction lost per second).
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.01;

/// Default damping applied to angular velocity (fraction lost per second).
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.01;

/// Speed below which a body starts counting towards sleep.
pub const DEFAULT_SLEEP_SPEED_LIMIT: f32 = 0.1;

/// Seconds a body must stay below the speed limit before it sleeps.
pub const DEFAULT_SLEEP_TIME_LIMIT: f32 = 1.0;

/// Force bound of contact equations.
pub const DEFAULT_CONTACT_MAX_FORCE: f32 = 1e6;

/// Separation up to which hull vertices above a plane still count as
/// touching. Resting hulls sink only about 1e-6 under the default SPOOK
/// parameters, well inside single-precision noise on a tilt.
pub const PLANE_CONTACT_SKIN: f32 = 5e-3;

/// Broadphase strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BroadphaseKind {
    /// O(n²) all-pairs scan.
    #[default]
    Naive,
    /// Sorted single-axis sweep.
    SweepAndPrune { axis: SweepAxis },
}

/// Sort axis of the sweep-and-prune broadphase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SweepAxis {
    /// Re-pick the axis of largest positional variance every step.
    #[default]
    Auto,
    X,
    Y,
    Z,
}

/// Bounding volume used to confirm broadphase candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BoundingVolume {
    #[default]
    Sphere,
    Aabb,
}

/// How orientations are renormalised after integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QuatNormalization {
    Off,
    #[default]
    Exact,
    Fast,
}

/// Everything a [`World`](crate::world::World) needs at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec3,
    /// Gravity used for friction bounds; `None` uses `gravity`.
    pub friction_gravity: Option<Vec3>,
    pub solver_iterations: u32,
    pub solver_tolerance: f32,
    pub broadphase: BroadphaseKind,
    pub bounding_volume: BoundingVolume,
    pub allow_sleep: bool,
    pub quat_normalization: QuatNormalization,
    /// Replace per-contact friction with one averaged pair per shape pair.
    pub friction_reduction: bool,
    pub default_contact_material: ContactMaterialParams,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            friction_gravity: None,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            solver_tolerance: DEFAULT_SOLVER_TOLERANCE,
            broadphase: BroadphaseKind::default(),
            bounding_volume: BoundingVolume::default(),
            allow_sleep: true,
            quat_normalization: QuatNormalization::default(),
            friction_reduction: false,
            default_contact_material: ContactMaterialParams::default(),
        }
    }
}

impl WorldConfig {
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_broadphase(mut self, broadphase: BroadphaseKind) -> Self {
        self.broadphase = broadphase;
        self
    }

    pub fn with_bounding_volume(mut self, volume: BoundingVolume) -> Self {
        self.bounding_volume = volume;
        self
    }

    pub fn with_solver(mut self, iterations: u32, tolerance: f32) -> Self {
        self.solver_iterations = iterations;
        self.solver_tolerance = tolerance;
        self
    }

    pub fn with_allow_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }

    pub fn with_friction_reduction(mut self, enabled: bool) -> Self {
        self.friction_reduction = enabled;
        self
    }

    pub fn with_quat_normalization(mut self, mode: QuatNormalization) -> Self {
        self.quat_normalization = mode;
        self
    }

    pub fn with_default_contact_material(mut self, params: ContactMaterialParams) -> Self {
        self.default_contact_material = params;
        self
    }
}
