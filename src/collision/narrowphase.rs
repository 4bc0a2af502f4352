//! Turns broadphase pairs into contact and friction points.

use std::collections::HashSet;

use glam::Vec3;

use super::contact::{ContactPoint, FrictionPoint, RawContact};
use super::routines::{collide_shapes, ShapeInstance};
use crate::core::{rigidbody::Body, shape::ShapeKind, types::MaterialTable};
use crate::utils::{allocator::BodyId, math::tangents};

/// `(body_a, shape_a, body_b, shape_b)` of a touching shape pair.
pub type ShapePairKey = (BodyId, usize, BodyId, usize);

/// Everything the narrowphase produced during one step.
#[derive(Debug, Default)]
pub struct NarrowphaseOutput {
    pub contacts: Vec<ContactPoint>,
    pub frictions: Vec<FrictionPoint>,
    pub body_overlaps: Vec<(BodyId, BodyId)>,
    pub shape_overlaps: Vec<ShapePairKey>,
}

impl NarrowphaseOutput {
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.frictions.clear();
        self.body_overlaps.clear();
        self.shape_overlaps.clear();
    }
}

#[derive(Debug, Default)]
pub struct NarrowPhase {
    /// Magnitude of the gravity used to size friction bounds.
    pub friction_gravity: f32,
    /// Collapse the friction rows of a shape pair into one averaged pair.
    pub friction_reduction: bool,
    raw: Vec<RawContact>,
    reported_unsupported: HashSet<(ShapeKind, ShapeKind)>,
}

impl NarrowPhase {
    pub fn new(friction_gravity: f32, friction_reduction: bool) -> Self {
        Self {
            friction_gravity,
            friction_reduction,
            ..Self::default()
        }
    }

    /// Tests every shape pair of two bodies. Returns true if any shapes touch.
    ///
    /// Kinematic-static pairs only report overlap; every other touching pair
    /// also gets contact points and, when friction is positive, two tangent
    /// rows per contact.
    pub fn collide_bodies(
        &mut self,
        (id_a, a): (BodyId, &Body),
        (id_b, b): (BodyId, &Body),
        materials: &MaterialTable,
        out: &mut NarrowphaseOutput,
    ) -> bool {
        let just_test = (a.is_kinematic() && b.is_static()) || (a.is_static() && b.is_kinematic());
        let body_response = a.collision_response && b.collision_response;
        let mut touching = false;

        for (i, shape_a) in a.shapes().iter().enumerate() {
            for (j, shape_b) in b.shapes().iter().enumerate() {
                if !shape_a.shape.filter.accepts(&shape_b.shape.filter) {
                    continue;
                }
                let transform_a = a.shape_transform(i);
                let transform_b = b.shape_transform(j);
                let reach = shape_a.shape.bounding_radius() + shape_b.shape.bounding_radius();
                if transform_a.position.distance(transform_b.position) > reach {
                    continue;
                }

                self.raw.clear();
                let supported = collide_shapes(
                    ShapeInstance::new(&shape_a.shape, transform_a),
                    ShapeInstance::new(&shape_b.shape, transform_b),
                    &mut self.raw,
                );
                if !supported {
                    self.report_unsupported(shape_a.shape.kind(), shape_b.shape.kind());
                    continue;
                }
                if self.raw.is_empty() {
                    continue;
                }

                touching = true;
                out.shape_overlaps.push((id_a, i, id_b, j));
                if just_test {
                    continue;
                }

                let params = materials.resolve(a.material, b.material, shape_a.shape.material, shape_b.shape.material);
                let enabled = body_response
                    && shape_a.shape.collision_response
                    && shape_b.shape.collision_response;

                let first = out.contacts.len();
                out.contacts.extend(self.raw.iter().map(|rc| ContactPoint {
                    body_a: id_a,
                    body_b: id_b,
                    shape_a: i,
                    shape_b: j,
                    normal: rc.normal,
                    ri: rc.point_a - a.position,
                    rj: rc.point_b - b.position,
                    restitution: params.restitution,
                    friction: params.friction,
                    stiffness: params.contact_stiffness,
                    relaxation: params.contact_relaxation,
                    enabled,
                }));

                if !enabled || params.friction <= 0.0 {
                    continue;
                }
                let inv_mass_sum = a.inv_mass() + b.inv_mass();
                let reduced_mass = if inv_mass_sum > 0.0 { 1.0 / inv_mass_sum } else { 0.0 };
                let slip_force = params.friction * self.friction_gravity * reduced_mass;
                let friction_row = |tangent: Vec3, ri: Vec3, rj: Vec3| FrictionPoint {
                    body_a: id_a,
                    body_b: id_b,
                    tangent,
                    ri,
                    rj,
                    slip_force,
                    stiffness: params.friction_stiffness,
                    relaxation: params.friction_relaxation,
                    enabled,
                };

                let new_contacts = &out.contacts[first..];
                if self.friction_reduction && new_contacts.len() > 1 {
                    let count = new_contacts.len() as f32;
                    let (normal, ri, rj) = new_contacts.iter().fold(
                        (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO),
                        |(n, ri, rj), c| (n + c.normal, ri + c.ri, rj + c.rj),
                    );
                    let (t1, t2) = tangents(normal.normalize_or_zero());
                    let (ri, rj) = (ri / count, rj / count);
                    out.frictions.push(friction_row(t1, ri, rj));
                    out.frictions.push(friction_row(t2, ri, rj));
                } else {
                    for c in new_contacts {
                        let (t1, t2) = tangents(c.normal);
                        out.frictions.push(friction_row(t1, c.ri, c.rj));
                        out.frictions.push(friction_row(t2, c.ri, c.rj));
                    }
                }
            }
        }

        if touching {
            out.body_overlaps.push((id_a, id_b));
        }
        touching
    }

    fn report_unsupported(&mut self, a: ShapeKind, b: ShapeKind) {
        let key = if a <= b { (a, b) } else { (b, a) };
        if self.reported_unsupported.insert(key) {
            log::debug!("no collision routine for {:?} vs {:?}; pair ignored", key.0, key.1);
        }
    }
}
