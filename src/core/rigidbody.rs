use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::mesh::Aabb;
use super::shape::{CollisionFilter, Shape, ShapeKind};
use super::types::{MaterialId, Transform};
use crate::config::{
    DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING, DEFAULT_SLEEP_SPEED_LIMIT,
    DEFAULT_SLEEP_TIME_LIMIT,
};
use crate::utils::allocator::BodyId;
use crate::utils::math::{box_inertia, world_inverse_inertia};

/// How a body takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    /// Moved by forces and contacts.
    Dynamic,
    /// Never moves.
    Static,
    /// Moves with its user-set velocity; ignores forces and contacts.
    Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepState {
    Awake,
    Sleepy,
    Sleeping,
}

/// A shape attached to a body at a local offset and orientation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyShape {
    pub shape: Shape,
    pub offset: Vec3,
    pub orientation: Quat,
}

impl BodyShape {
    pub fn local_transform(&self) -> Transform {
        Transform::new(self.offset, self.orientation)
    }
}

/// Rigid body state, shapes and mass properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub(crate) id: BodyId,
    pub body_type: BodyType,

    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub force: Vec3,
    pub torque: Vec3,

    pub(crate) previous_position: Vec3,
    pub(crate) previous_orientation: Quat,
    pub(crate) interpolated_position: Vec3,
    pub(crate) interpolated_orientation: Quat,

    mass: f32,
    inv_mass: f32,
    inertia: Vec3,
    inv_inertia: Vec3,
    pub(crate) inv_inertia_world: Mat3,

    pub linear_damping: f32,
    pub angular_damping: f32,
    pub linear_factor: Vec3,
    pub angular_factor: Vec3,
    fixed_rotation: bool,

    pub material: Option<MaterialId>,
    pub filter: CollisionFilter,
    pub collision_response: bool,

    pub allow_sleep: bool,
    pub sleep_speed_limit: f32,
    pub sleep_time_limit: f32,
    pub(crate) sleep_state: SleepState,
    pub(crate) time_last_sleepy: f32,
    pub(crate) wake_up_after_narrowphase: bool,

    shapes: Vec<BodyShape>,
    bounding_radius: f32,
}

impl Default for Body {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Body {
    /// Positive mass makes a dynamic body, anything else a static one.
    pub fn new(mass: f32) -> Self {
        let body_type = if mass > 0.0 {
            BodyType::Dynamic
        } else {
            BodyType::Static
        };
        let mut body = Self {
            id: BodyId::default(),
            body_type,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            previous_orientation: Quat::IDENTITY,
            interpolated_position: Vec3::ZERO,
            interpolated_orientation: Quat::IDENTITY,
            mass: mass.max(0.0),
            inv_mass: 0.0,
            inertia: Vec3::ZERO,
            inv_inertia: Vec3::ZERO,
            inv_inertia_world: Mat3::ZERO,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
            fixed_rotation: false,
            material: None,
            filter: CollisionFilter::default(),
            collision_response: true,
            allow_sleep: true,
            sleep_speed_limit: DEFAULT_SLEEP_SPEED_LIMIT,
            sleep_time_limit: DEFAULT_SLEEP_TIME_LIMIT,
            sleep_state: SleepState::Awake,
            time_last_sleepy: 0.0,
            wake_up_after_narrowphase: false,
            shapes: Vec::new(),
            bounding_radius: 0.0,
        };
        body.update_mass_properties();
        body
    }

    pub fn with_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self.update_mass_properties();
        self
    }

    pub fn with_shape(self, shape: Shape) -> Self {
        self.with_shape_at(shape, Vec3::ZERO, Quat::IDENTITY)
    }

    pub fn with_shape_at(mut self, shape: Shape, offset: Vec3, orientation: Quat) -> Self {
        self.add_shape(shape, offset, orientation);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.set_orientation(orientation);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_linear_factor(mut self, factor: Vec3) -> Self {
        self.linear_factor = factor;
        self
    }

    pub fn with_angular_factor(mut self, factor: Vec3) -> Self {
        self.angular_factor = factor;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self.update_mass_properties();
        self
    }

    pub fn with_collision_filter(mut self, group: u32, mask: u32) -> Self {
        self.filter = CollisionFilter::new(group, mask);
        self
    }

    pub fn with_collision_response(mut self, enabled: bool) -> Self {
        self.collision_response = enabled;
        self
    }

    pub fn with_allow_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }

    pub fn with_sleep_limits(mut self, speed_limit: f32, time_limit: f32) -> Self {
        self.sleep_speed_limit = speed_limit;
        self.sleep_time_limit = time_limit;
        self
    }

    /// Handle assigned by the world; null until the body is added.
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn add_shape(&mut self, shape: Shape, offset: Vec3, orientation: Quat) {
        self.shapes.push(BodyShape {
            shape,
            offset,
            orientation,
        });
        self.update_mass_properties();
        self.update_bounding_radius();
    }

    pub fn shapes(&self) -> &[BodyShape] {
        &self.shapes
    }

    /// Teleports the body; previous and interpolated poses follow so the
    /// renderer does not blend across the jump.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.previous_position = position;
        self.interpolated_position = position;
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation;
        self.previous_orientation = orientation;
        self.interpolated_orientation = orientation;
        self.update_inertia_world();
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.update_mass_properties();
    }

    pub fn set_fixed_rotation(&mut self, fixed: bool) {
        self.fixed_rotation = fixed;
        self.update_mass_properties();
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    pub fn inertia(&self) -> Vec3 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> Vec3 {
        self.inv_inertia
    }

    pub fn inv_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    pub fn fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    pub fn sleep_state(&self) -> SleepState {
        self.sleep_state
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep_state == SleepState::Sleeping
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.orientation)
    }

    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    pub fn previous_orientation(&self) -> Quat {
        self.previous_orientation
    }

    /// Render-side position blended between the last two fixed steps.
    pub fn interpolated_position(&self) -> Vec3 {
        self.interpolated_position
    }

    pub fn interpolated_orientation(&self) -> Quat {
        self.interpolated_orientation
    }

    /// Recomputes inverse mass and the diagonal inertia from the shapes.
    ///
    /// A single centred shape uses its exact inertia; anything else is
    /// approximated by the box enclosing all shapes.
    pub fn update_mass_properties(&mut self) {
        let dynamic = self.body_type == BodyType::Dynamic && self.mass > 0.0;
        self.inv_mass = if dynamic { 1.0 / self.mass } else { 0.0 };

        self.inertia = match self.shapes.as_slice() {
            [] => Vec3::ZERO,
            [single] if single.offset == Vec3::ZERO && single.orientation == Quat::IDENTITY => {
                single.shape.local_inertia(self.mass)
            }
            shapes => {
                let mut bounds = Aabb::empty();
                for s in shapes {
                    let b = s.shape.aabb(&s.local_transform());
                    if b.min.is_finite() && b.max.is_finite() {
                        bounds = bounds.union(&b);
                    }
                }
                if bounds.min.is_finite() {
                    box_inertia(bounds.extent(), self.mass)
                } else {
                    Vec3::ZERO
                }
            }
        };

        self.inv_inertia = if dynamic && !self.fixed_rotation {
            Vec3::new(
                recip_or_zero(self.inertia.x),
                recip_or_zero(self.inertia.y),
                recip_or_zero(self.inertia.z),
            )
        } else {
            Vec3::ZERO
        };
        self.update_inertia_world();
    }

    pub(crate) fn update_inertia_world(&mut self) {
        self.inv_inertia_world = world_inverse_inertia(self.orientation, self.inv_inertia);
    }

    fn update_bounding_radius(&mut self) {
        self.bounding_radius = self
            .shapes
            .iter()
            .map(|s| {
                let r = s.shape.bounding_radius();
                if r == f32::MAX {
                    r
                } else {
                    s.offset.length() + r
                }
            })
            .fold(0.0, f32::max);
    }

    /// Radius around the body origin enclosing every shape.
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// World transform of shape `index`.
    pub fn shape_transform(&self, index: usize) -> Transform {
        self.transform().combine(&self.shapes[index].local_transform())
    }

    pub fn aabb(&self) -> Aabb {
        let body = self.transform();
        let mut bounds = Aabb::empty();
        for s in &self.shapes {
            bounds = bounds.union(&s.shape.aabb(&body.combine(&s.local_transform())));
        }
        if self.shapes.is_empty() {
            bounds = Aabb::new(self.position, self.position);
        }
        bounds
    }

    pub fn has_shape_kind(&self, kind: ShapeKind) -> bool {
        self.shapes.iter().any(|s| s.shape.kind() == kind)
    }

    pub fn point_to_local(&self, world: Vec3) -> Vec3 {
        self.transform().point_to_local(world)
    }

    pub fn point_to_world(&self, local: Vec3) -> Vec3 {
        self.transform().point_to_world(local)
    }

    pub fn vector_to_local(&self, world: Vec3) -> Vec3 {
        self.orientation.conjugate() * world
    }

    pub fn vector_to_world(&self, local: Vec3) -> Vec3 {
        self.orientation * local
    }

    pub fn velocity_at_world_point(&self, world_point: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(world_point - self.position)
    }

    /// Adds `force` at `relative_point` (world frame, relative to the centre).
    pub fn apply_force(&mut self, force: Vec3, relative_point: Vec3) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if self.sleep_state == SleepState::Sleeping {
            self.wake_up();
        }
        self.force += force;
        self.torque += relative_point.cross(force);
    }

    /// Force and point given in the body frame.
    pub fn apply_local_force(&mut self, local_force: Vec3, local_point: Vec3) {
        let force = self.vector_to_world(local_force);
        let point = self.vector_to_world(local_point);
        self.apply_force(force, point);
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if self.sleep_state == SleepState::Sleeping {
            self.wake_up();
        }
        self.torque += torque;
    }

    /// Instant velocity change from `impulse` at `relative_point`.
    pub fn apply_impulse(&mut self, impulse: Vec3, relative_point: Vec3) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if self.sleep_state == SleepState::Sleeping {
            self.wake_up();
        }
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * relative_point.cross(impulse);
    }

    pub fn apply_local_impulse(&mut self, local_impulse: Vec3, local_point: Vec3) {
        let impulse = self.vector_to_world(local_impulse);
        let point = self.vector_to_world(local_point);
        self.apply_impulse(impulse, point);
    }

    /// Returns true when the body was not already awake.
    pub fn wake_up(&mut self) -> bool {
        let was = self.sleep_state;
        self.sleep_state = SleepState::Awake;
        self.wake_up_after_narrowphase = false;
        was != SleepState::Awake
    }

    pub fn sleep(&mut self) {
        self.sleep_state = SleepState::Sleeping;
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.wake_up_after_narrowphase = false;
    }

    pub(crate) fn speed_squared(&self) -> f32 {
        self.velocity.length_squared() + self.angular_velocity.length_squared()
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }
}

fn recip_or_zero(v: f32) -> f32 {
    if v > 0.0 {
        1.0 / v
    } else {
        0.0
    }
}
