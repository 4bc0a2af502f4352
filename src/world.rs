//! The simulation container and its fixed-step pipeline.

mod collision_manager;
mod dynamics_manager;
pub mod events;

use std::time::Instant;

use glam::Vec3;
use log::{debug, warn};

use crate::{
    collision::{
        contact::ContactPoint,
        queries::{Ray, RaycastHit, RaycastMode, RaycastOptions},
    },
    config::{BroadphaseKind, WorldConfig},
    core::{
        constraints::{Constraint, ConstraintId},
        rigidbody::{Body, BodyType, SleepState},
        types::{ContactMaterial, Material, MaterialId, MaterialTable},
    },
    dynamics::sleep::{should_wake_from_contact, sleep_tick, SleepTransition},
    utils::{
        allocator::{Arena, BodyId},
        logging::ScopedTimer,
        profiling::StepProfiler,
    },
};

use collision_manager::CollisionManager;
use dynamics_manager::DynamicsManager;
pub use events::WorldEvent;

/// Owns bodies, materials and constraints and advances them in time.
pub struct World {
    config: WorldConfig,
    bodies: Arena<Body>,
    body_order: Vec<BodyId>,
    materials: MaterialTable,
    constraints: Vec<(ConstraintId, Constraint)>,
    next_constraint: u32,
    collision: CollisionManager,
    dynamics: DynamicsManager,
    events: Vec<WorldEvent>,
    time: f32,
    accumulator: f32,
    step_count: u64,
    profiler: StepProfiler,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            bodies: Arena::new(),
            body_order: Vec::new(),
            materials: MaterialTable::new(config.default_contact_material),
            constraints: Vec::new(),
            next_constraint: 0,
            collision: CollisionManager::new(&config),
            dynamics: DynamicsManager::new(&config),
            events: Vec::new(),
            time: 0.0,
            accumulator: 0.0,
            step_count: 0,
            profiler: StepProfiler::default(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
        if self.config.friction_gravity.is_none() {
            self.collision.narrowphase.friction_gravity = gravity.length();
        }
    }

    pub fn set_broadphase(&mut self, kind: BroadphaseKind) {
        self.config.broadphase = kind;
        self.collision.set_broadphase(kind);
    }

    /// Integrates bodies on the rayon pool when built with the `parallel` feature.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.dynamics.integrator.set_parallel(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.dynamics.integrator.is_parallel()
    }

    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = self.bodies.insert(body);
        if let Some(stored) = self.bodies.get_mut(id) {
            stored.id = id;
            debug!(
                "added {:?} body {:?} with {} shape(s)",
                stored.body_type,
                id,
                stored.shapes().len()
            );
        }
        self.body_order.push(id);
        id
    }

    /// Removes a body together with its constraints and overlap records.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let body = self.bodies.remove(id)?;
        self.body_order.retain(|&b| b != id);
        let before = self.constraints.len();
        self.constraints
            .retain(|(_, c)| c.body_a != id && c.body_b != id);
        self.collision.forget_body(id);
        debug!(
            "removed body {:?} and {} constraint(s)",
            id,
            before - self.constraints.len()
        );
        Some(body)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Bodies in insertion order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> + '_ {
        self.body_order
            .iter()
            .filter_map(|&id| self.bodies.get(id).map(|b| (id, b)))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// True while any dynamic body is not asleep.
    pub fn has_active_bodies(&self) -> bool {
        self.bodies
            .iter()
            .any(|(_, b)| b.body_type == BodyType::Dynamic && b.sleep_state != SleepState::Sleeping)
    }

    /// Contacts generated by the last step.
    pub fn contacts(&self) -> &[ContactPoint] {
        &self.collision.output.contacts
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.add_material(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.material(id)
    }

    pub fn add_contact_material(&mut self, contact: ContactMaterial) {
        self.materials.add_contact_material(contact);
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> ConstraintId {
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        debug!(
            "added constraint {:?} between {:?} and {:?}",
            id, constraint.body_a, constraint.body_b
        );
        self.constraints.push((id, constraint));
        id
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        let index = self.constraints.iter().position(|(cid, _)| *cid == id)?;
        debug!("removed constraint {:?}", id);
        Some(self.constraints.remove(index).1)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, c)| c)
    }

    /// Timings and counters of the last fixed step.
    pub fn profile(&self) -> &StepProfiler {
        &self.profiler
    }

    /// Takes every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances exactly one fixed step of `dt` seconds and sets each body's
    /// interpolated pose to its new pose.
    pub fn step(&mut self, dt: f32) {
        self.internal_step(dt);
        for body in self.bodies.values_mut() {
            body.interpolated_position = body.position;
            body.interpolated_orientation = body.orientation;
        }
    }

    /// Consumes `elapsed` wall time in fixed steps of `dt`, at most
    /// `max_sub_steps` of them, and interpolates poses by the remainder.
    /// Returns the number of steps taken.
    pub fn step_accumulated(&mut self, dt: f32, elapsed: f32, max_sub_steps: u32) -> u32 {
        self.accumulator += elapsed;
        let mut substeps = 0;
        while self.accumulator >= dt && substeps < max_sub_steps {
            self.internal_step(dt);
            self.accumulator -= dt;
            substeps += 1;
        }
        if self.accumulator >= dt {
            warn!(
                "dropping {:.4}s of simulation time after {} sub-steps",
                self.accumulator - self.accumulator % dt,
                substeps
            );
        }
        self.accumulator %= dt;

        let t = self.accumulator / dt;
        for body in self.bodies.values_mut() {
            body.interpolated_position = body.previous_position.lerp(body.position, t);
            body.interpolated_orientation = body
                .previous_orientation
                .slerp(body.orientation, t)
                .normalize();
        }
        substeps
    }

    fn internal_step(&mut self, dt: f32) {
        self.profiler.reset();
        let _timer = ScopedTimer::new("world::step");
        let started = Instant::now();

        let gravity = self.config.gravity;
        for body in self.bodies.values_mut() {
            if body.body_type == BodyType::Dynamic {
                body.force += gravity * body.mass();
            }
        }

        {
            let _timer = ScopedTimer::recording("broadphase", &mut self.profiler.broadphase_time);
            self.collision.find_pairs(&self.bodies, &self.constraints);
        }

        {
            let _timer = ScopedTimer::recording("narrowphase", &mut self.profiler.narrowphase_time);
            self.collision.collide(&self.bodies, &self.materials);
        }

        if self.config.allow_sleep {
            self.flag_bodies_woken_by_contact();
        }
        self.emit_contact_events();

        let metrics = {
            let _timer = ScopedTimer::recording("solver", &mut self.profiler.solver_time);
            let counts = self.dynamics.build_equations(
                &self.bodies,
                &self.collision.output.contacts,
                &self.collision.output.frictions,
                &self.constraints,
            );
            self.profiler.contact_count = counts.contacts;
            self.profiler.friction_count = counts.frictions;
            self.profiler.constraint_equations = counts.constraints;
            self.dynamics.solve(&mut self.bodies, dt)
        };

        {
            let _timer = ScopedTimer::recording("integrator", &mut self.profiler.integrator_time);
            self.dynamics.integrator.step(&mut self.bodies, dt);
        }

        for body in self.bodies.values_mut() {
            body.clear_forces();
        }

        self.time += dt;
        self.step_count += 1;

        if self.config.allow_sleep {
            for &id in &self.body_order {
                let Some(body) = self.bodies.get_mut(id) else {
                    continue;
                };
                match sleep_tick(body, self.time) {
                    Some(SleepTransition::Wakeup) => self.events.push(WorldEvent::Wakeup(id)),
                    Some(SleepTransition::Sleepy) => self.events.push(WorldEvent::Sleepy(id)),
                    Some(SleepTransition::Sleep) => self.events.push(WorldEvent::Sleep(id)),
                    None => {}
                }
            }
        }

        self.profiler.body_count = self.bodies.len();
        self.profiler.candidate_pairs = self.collision.pairs.len();
        self.profiler.solver_iterations = metrics.iterations;
        self.profiler.total_time = started.elapsed();
        self.profiler.report();
    }

    /// Sleeping bodies hit by a fast-moving awake partner wake before solving.
    fn flag_bodies_woken_by_contact(&mut self) {
        for &(id_a, id_b) in &self.collision.output.body_overlaps {
            let (Some(a), Some(b)) = (self.bodies.get(id_a), self.bodies.get(id_b)) else {
                continue;
            };
            let wake_a = should_wake_from_contact(a, b);
            let wake_b = should_wake_from_contact(b, a);
            if wake_a {
                if let Some(a) = self.bodies.get_mut(id_a) {
                    a.wake_up_after_narrowphase = true;
                }
            }
            if wake_b {
                if let Some(b) = self.bodies.get_mut(id_b) {
                    b.wake_up_after_narrowphase = true;
                }
            }
        }

        for &id in &self.body_order {
            let Some(body) = self.bodies.get_mut(id) else {
                continue;
            };
            if body.wake_up_after_narrowphase && body.wake_up() {
                self.events.push(WorldEvent::Wakeup(id));
            }
        }
    }

    fn emit_contact_events(&mut self) {
        let mut reported: Vec<(BodyId, BodyId)> = Vec::new();
        for contact in &self.collision.output.contacts {
            let pair = (contact.body_a, contact.body_b);
            if self.collision.body_overlaps.was_overlapping(&pair) || reported.contains(&pair) {
                continue;
            }
            let (Some(a), Some(b)) = (self.bodies.get(pair.0), self.bodies.get(pair.1)) else {
                continue;
            };
            reported.push(pair);
            self.events.push(WorldEvent::Collide {
                body_a: pair.0,
                body_b: pair.1,
                impact_speed: contact.impact_velocity_along_normal(a, b).abs(),
                point: contact.world_point_b(b),
                normal: contact.normal,
            });
        }

        let mut begun = Vec::new();
        let mut ended = Vec::new();
        self.collision.body_overlaps.diff(&mut begun, &mut ended);
        self.events.extend(
            begun
                .into_iter()
                .map(|(body_a, body_b)| WorldEvent::BeginContact { body_a, body_b }),
        );
        self.events.extend(
            ended
                .into_iter()
                .map(|(body_a, body_b)| WorldEvent::EndContact { body_a, body_b }),
        );

        let mut begun = Vec::new();
        let mut ended = Vec::new();
        self.collision.shape_overlaps.diff(&mut begun, &mut ended);
        self.events.extend(begun.into_iter().map(|(body_a, shape_a, body_b, shape_b)| {
            WorldEvent::BeginShapeContact {
                body_a,
                shape_a,
                body_b,
                shape_b,
            }
        }));
        self.events.extend(ended.into_iter().map(|(body_a, shape_a, body_b, shape_b)| {
            WorldEvent::EndShapeContact {
                body_a,
                shape_a,
                body_b,
                shape_b,
            }
        }));
    }

    /// Casts a segment from `from` to `to` against the world's bodies.
    pub fn raycast(&self, from: Vec3, to: Vec3, options: &RaycastOptions) -> Vec<RaycastHit> {
        let ray = Ray::new(from, to);
        if ray.is_degenerate() {
            return Vec::new();
        }
        let mut candidates = Vec::new();
        self.collision
            .broadphase
            .aabb_query(&self.bodies, &ray.aabb(), &mut candidates);
        candidates.sort_unstable();
        ray.cast(
            candidates
                .iter()
                .filter_map(|&id| self.bodies.get(id).map(|b| (id, b))),
            options,
        )
    }

    pub fn raycast_closest(&self, from: Vec3, to: Vec3, options: &RaycastOptions) -> Option<RaycastHit> {
        let options = options.with_mode(RaycastMode::Closest);
        self.raycast(from, to, &options).into_iter().next()
    }

    pub fn raycast_any(&self, from: Vec3, to: Vec3, options: &RaycastOptions) -> Option<RaycastHit> {
        let options = options.with_mode(RaycastMode::Any);
        self.raycast(from, to, &options).into_iter().next()
    }
}
