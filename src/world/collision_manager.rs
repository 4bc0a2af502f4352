use crate::collision::{
    broadphase::{make_broadphase, BroadPhase},
    narrowphase::{NarrowPhase, NarrowphaseOutput, ShapePairKey},
    overlap::OverlapKeeper,
};
use crate::config::{BroadphaseKind, BoundingVolume, WorldConfig};
use crate::core::{
    constraints::{Constraint, ConstraintId},
    rigidbody::Body,
    types::MaterialTable,
};
use crate::utils::allocator::{Arena, BodyId};

/// Broadphase, narrowphase and overlap bookkeeping of a world.
pub struct CollisionManager {
    pub broadphase: Box<dyn BroadPhase>,
    pub narrowphase: NarrowPhase,
    pub bounding_volume: BoundingVolume,
    pub pairs: Vec<(BodyId, BodyId)>,
    pub output: NarrowphaseOutput,
    pub body_overlaps: OverlapKeeper<(BodyId, BodyId)>,
    pub shape_overlaps: OverlapKeeper<ShapePairKey>,
}

impl CollisionManager {
    pub fn new(config: &WorldConfig) -> Self {
        let friction_gravity = config.friction_gravity.unwrap_or(config.gravity).length();
        Self {
            broadphase: make_broadphase(config.broadphase),
            narrowphase: NarrowPhase::new(friction_gravity, config.friction_reduction),
            bounding_volume: config.bounding_volume,
            pairs: Vec::new(),
            output: NarrowphaseOutput::default(),
            body_overlaps: OverlapKeeper::new(),
            shape_overlaps: OverlapKeeper::new(),
        }
    }

    pub fn set_broadphase(&mut self, kind: BroadphaseKind) {
        self.broadphase = make_broadphase(kind);
    }

    /// Candidate pairs for this step, minus pairs joined by a constraint
    /// that disables collision between its bodies.
    pub fn find_pairs(&mut self, bodies: &Arena<Body>, constraints: &[(ConstraintId, Constraint)]) {
        self.pairs.clear();
        self.broadphase
            .collision_pairs(bodies, self.bounding_volume, &mut self.pairs);
        self.pairs.retain(|&(a, b)| {
            !constraints
                .iter()
                .any(|(_, c)| !c.collide_connected && c.involves(a, b))
        });
    }

    /// Runs the narrowphase over the current pairs and records overlaps.
    pub fn collide(&mut self, bodies: &Arena<Body>, materials: &MaterialTable) {
        self.output.clear();
        self.body_overlaps.tick();
        self.shape_overlaps.tick();

        for &(id_a, id_b) in &self.pairs {
            let (Some(a), Some(b)) = (bodies.get(id_a), bodies.get(id_b)) else {
                continue;
            };
            self.narrowphase
                .collide_bodies((id_a, a), (id_b, b), materials, &mut self.output);
        }

        for &pair in &self.output.body_overlaps {
            self.body_overlaps.set(pair);
        }
        for &key in &self.output.shape_overlaps {
            self.shape_overlaps.set(key);
        }
    }

    /// Drops every overlap record mentioning `id`.
    pub fn forget_body(&mut self, id: BodyId) {
        self.body_overlaps.forget(|&(a, b)| a == id || b == id);
        self.shape_overlaps.forget(|&(a, _, b, _)| a == id || b == id);
    }
}
