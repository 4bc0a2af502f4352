use crate::config::QuatNormalization;
use crate::core::rigidbody::{Body, BodyType, SleepState};
use crate::utils::allocator::Arena;
use crate::utils::math::{integrate_quat, normalize_quat, normalize_quat_fast};

/// Semi-implicit Euler integrator for body kinematics.
#[derive(Debug, Clone)]
pub struct Integrator {
    pub quat_normalization: QuatNormalization,
    parallel: bool,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(QuatNormalization::default())
    }
}

impl Integrator {
    pub fn new(quat_normalization: QuatNormalization) -> Self {
        Self {
            quat_normalization,
            parallel: false,
        }
    }

    /// Integrates bodies on the rayon pool when the `parallel` feature is on.
    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// `v *= (1 - damping)^dt` on dynamic bodies.
    pub fn apply_damping(body: &mut Body, dt: f32) {
        if body.body_type != BodyType::Dynamic {
            return;
        }
        body.velocity *= (1.0 - body.linear_damping).powf(dt);
        body.angular_velocity *= (1.0 - body.angular_damping).powf(dt);
    }

    /// Saves the previous pose, then advances velocity from the accumulated
    /// force and position from the new velocity. Static and sleeping bodies
    /// keep their pose; kinematic bodies move with their set velocity.
    pub fn integrate_body(body: &mut Body, dt: f32, normalization: QuatNormalization) {
        body.previous_position = body.position;
        body.previous_orientation = body.orientation;

        if body.body_type == BodyType::Static || body.sleep_state == SleepState::Sleeping {
            return;
        }

        let inv_mass = body.inv_mass();
        body.velocity += body.force * (inv_mass * dt) * body.linear_factor;
        body.angular_velocity +=
            (body.inv_inertia_world() * body.torque) * dt * body.angular_factor;

        body.position += body.velocity * dt;
        let q = integrate_quat(body.orientation, body.angular_velocity, body.angular_factor, dt);
        body.orientation = match normalization {
            QuatNormalization::Off => q,
            QuatNormalization::Exact => normalize_quat(q),
            QuatNormalization::Fast => normalize_quat_fast(q),
        };
        body.update_inertia_world();
    }

    pub fn step(&self, bodies: &mut Arena<Body>, dt: f32) {
        let mode = self.quat_normalization;

        #[cfg(feature = "parallel")]
        if self.parallel {
            use rayon::prelude::*;
            bodies.par_values_mut().for_each(|body| {
                Self::apply_damping(body, dt);
                Self::integrate_body(body, dt, mode);
            });
            return;
        }

        for body in bodies.values_mut() {
            Self::apply_damping(body, dt);
            Self::integrate_body(body, dt, mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::Shape;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};

    fn ball() -> Body {
        Body::new(1.0)
            .with_shape(Shape::sphere(1.0).unwrap())
            .with_damping(0.0, 0.0)
    }

    #[test]
    fn semi_implicit_euler_uses_new_velocity() {
        let mut body = ball();
        body.force = Vec3::new(0.0, -10.0, 0.0);
        Integrator::integrate_body(&mut body, 0.1, QuatNormalization::Exact);
        assert_relative_eq!(body.velocity.y, -1.0, epsilon = 1e-6);
        assert_relative_eq!(body.position.y, -0.1, epsilon = 1e-6);
        assert_eq!(body.previous_position(), Vec3::ZERO);
    }

    #[test]
    fn spin_keeps_unit_quaternion() {
        let mut body = ball().with_angular_velocity(Vec3::new(0.0, 3.0, 0.0));
        for _ in 0..120 {
            Integrator::integrate_body(&mut body, 1.0 / 60.0, QuatNormalization::Exact);
        }
        assert_relative_eq!(body.orientation.length(), 1.0, epsilon = 1e-5);
        let expected = Quat::from_rotation_y(6.0);
        assert!(body.orientation.dot(expected).abs() > 0.99);
    }

    #[test]
    fn static_and_sleeping_bodies_do_not_move() {
        let mut wall = Body::new(0.0).with_velocity(Vec3::X);
        Integrator::integrate_body(&mut wall, 1.0, QuatNormalization::Exact);
        assert_eq!(wall.position, Vec3::ZERO);

        let mut sleeper = ball();
        sleeper.sleep();
        sleeper.force = Vec3::Y;
        Integrator::integrate_body(&mut sleeper, 1.0, QuatNormalization::Exact);
        assert_eq!(sleeper.position, Vec3::ZERO);
    }

    #[test]
    fn kinematic_body_follows_velocity_not_forces() {
        let mut body = Body::new(1.0)
            .with_type(BodyType::Kinematic)
            .with_velocity(Vec3::X);
        body.force = Vec3::new(0.0, 100.0, 0.0);
        Integrator::integrate_body(&mut body, 0.5, QuatNormalization::Exact);
        assert_eq!(body.velocity, Vec3::X);
        assert_relative_eq!(body.position.x, 0.5);
    }

    #[test]
    fn damping_is_frame_rate_independent() {
        let mut a = ball().with_velocity(Vec3::X);
        a.linear_damping = 0.5;
        let mut b = a.clone();
        Integrator::apply_damping(&mut a, 1.0);
        Integrator::apply_damping(&mut b, 0.5);
        Integrator::apply_damping(&mut b, 0.5);
        assert_relative_eq!(a.velocity.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(a.velocity.x, b.velocity.x, epsilon = 1e-6);
    }
}
