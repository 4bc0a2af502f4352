use std::collections::HashSet;

use glam::Vec3;

use crate::{
    config::{BoundingVolume, BroadphaseKind, SweepAxis},
    core::{
        mesh::Aabb,
        rigidbody::{Body, BodyType, SleepState},
    },
    utils::allocator::{Arena, BodyId},
};

/// Candidate pair producer run at the start of each step.
pub trait BroadPhase: Send + Sync {
    /// Writes candidate pairs to `pairs`, each ordered with the lower slot
    /// index first and without duplicates.
    fn collision_pairs(
        &mut self,
        bodies: &Arena<Body>,
        volume: BoundingVolume,
        pairs: &mut Vec<(BodyId, BodyId)>,
    );

    /// Bodies whose world AABB overlaps `query`.
    fn aabb_query(&self, bodies: &Arena<Body>, query: &Aabb, result: &mut Vec<BodyId>) {
        for (id, body) in bodies.iter() {
            if body.aabb().overlaps(query) {
                result.push(id);
            }
        }
    }
}

/// Builds the broadphase selected in the world configuration.
pub fn make_broadphase(kind: BroadphaseKind) -> Box<dyn BroadPhase> {
    match kind {
        BroadphaseKind::Naive => Box::new(NaiveBroadphase),
        BroadphaseKind::SweepAndPrune { axis } => Box::new(SweepAndPrune::new(axis)),
    }
}

/// Filter masks must accept each other, and at least one body must be able
/// to move: pairs where both sides are static or sleeping are skipped.
pub fn needs_broadphase_collision(a: &Body, b: &Body) -> bool {
    if !a.filter.accepts(&b.filter) {
        return false;
    }
    let inert = |body: &Body| {
        body.body_type == BodyType::Static || body.sleep_state == SleepState::Sleeping
    };
    !(inert(a) && inert(b))
}

/// Bounds of one body along the volume used for the overlap test.
#[derive(Debug, Clone, Copy)]
struct Proxy {
    center: Vec3,
    radius: f32,
    aabb: Aabb,
}

impl Proxy {
    fn new(body: &Body, volume: BoundingVolume) -> Self {
        let radius = body.bounding_radius();
        let aabb = match volume {
            BoundingVolume::Aabb => body.aabb(),
            BoundingVolume::Sphere => {
                // Sweep bounds only prune; pad them so rounding never drops a
                // pair whose spheres touch exactly.
                let pad = (body.position.abs().max_element() + radius) * 4.0 * f32::EPSILON;
                let extent = Vec3::splat(radius + pad);
                Aabb::new(body.position - extent, body.position + extent)
            }
        };
        Self {
            center: body.position,
            radius,
            aabb,
        }
    }

    fn overlaps(&self, other: &Proxy, volume: BoundingVolume) -> bool {
        match volume {
            BoundingVolume::Sphere => {
                let r = self.radius + other.radius;
                self.center.distance_squared(other.center) <= r * r
            }
            BoundingVolume::Aabb => self.aabb.overlaps(&other.aabb),
        }
    }
}

/// Exact bounding-volume test between two bodies.
pub fn bodies_overlap(a: &Body, b: &Body, volume: BoundingVolume) -> bool {
    Proxy::new(a, volume).overlaps(&Proxy::new(b, volume), volume)
}

fn push_ordered(a: BodyId, b: BodyId, pairs: &mut Vec<(BodyId, BodyId)>) {
    if a.index() < b.index() {
        pairs.push((a, b));
    } else {
        pairs.push((b, a));
    }
}

/// Removes repeated pairs while keeping first-seen order.
pub fn make_pairs_unique(pairs: &mut Vec<(BodyId, BodyId)>) {
    let mut seen = HashSet::with_capacity(pairs.len());
    pairs.retain(|&(a, b)| seen.insert((a.index(), b.index())));
}

/// Tests every pair of bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveBroadphase;

impl BroadPhase for NaiveBroadphase {
    fn collision_pairs(
        &mut self,
        bodies: &Arena<Body>,
        volume: BoundingVolume,
        pairs: &mut Vec<(BodyId, BodyId)>,
    ) {
        let proxies: Vec<(BodyId, &Body, Proxy)> = bodies
            .iter()
            .map(|(id, body)| (id, body, Proxy::new(body, volume)))
            .collect();

        for (i, (id_a, a, pa)) in proxies.iter().enumerate() {
            for (id_b, b, pb) in &proxies[i + 1..] {
                if needs_broadphase_collision(a, b) && pa.overlaps(pb, volume) {
                    push_ordered(*id_a, *id_b, pairs);
                }
            }
        }
        make_pairs_unique(pairs);
    }
}

/// Single-axis sweep and prune over a persistently sorted body list.
#[derive(Debug, Clone)]
pub struct SweepAndPrune {
    axis: SweepAxis,
    axis_index: usize,
    sorted: Vec<BodyId>,
}

impl Default for SweepAndPrune {
    fn default() -> Self {
        Self::new(SweepAxis::Auto)
    }
}

impl SweepAndPrune {
    pub fn new(axis: SweepAxis) -> Self {
        Self {
            axis,
            axis_index: 0,
            sorted: Vec::new(),
        }
    }

    /// Axis the last sweep sorted along (0 = X, 1 = Y, 2 = Z).
    pub fn axis_index(&self) -> usize {
        self.axis_index
    }

    /// Keeps the sorted list in sync with the arena: stale handles are
    /// dropped and new bodies appended (the sort then moves them).
    fn sync(&mut self, bodies: &Arena<Body>) {
        self.sorted.retain(|id| bodies.contains(*id));
        if self.sorted.len() != bodies.len() {
            let known: HashSet<BodyId> = self.sorted.iter().copied().collect();
            self.sorted
                .extend(bodies.ids().filter(|id| !known.contains(id)));
        }
    }

    /// Axis with the largest variance of body positions.
    fn auto_detect_axis(bodies: &Arena<Body>) -> usize {
        let n = bodies.len();
        if n < 2 {
            return 0;
        }
        let mut sum = Vec3::ZERO;
        let mut sum_sq = Vec3::ZERO;
        for (_, body) in bodies.iter() {
            sum += body.position;
            sum_sq += body.position * body.position;
        }
        let inv = 1.0 / (n as f32 - 1.0);
        let variance = (sum_sq - sum * sum / n as f32) * inv;
        if variance.x >= variance.y && variance.x >= variance.z {
            0
        } else if variance.y >= variance.z {
            1
        } else {
            2
        }
    }
}

/// Insertion sort by key; near-linear on the almost sorted lists a
/// persistent sweep sees between steps.
fn insertion_sort_by_key(ids: &mut [BodyId], keys: &[f32]) {
    for i in 1..ids.len() {
        let id = ids[i];
        let key = keys[id.index()];
        let mut j = i;
        while j > 0 && keys[ids[j - 1].index()] > key {
            ids[j] = ids[j - 1];
            j -= 1;
        }
        ids[j] = id;
    }
}

impl BroadPhase for SweepAndPrune {
    fn collision_pairs(
        &mut self,
        bodies: &Arena<Body>,
        volume: BoundingVolume,
        pairs: &mut Vec<(BodyId, BodyId)>,
    ) {
        self.sync(bodies);
        self.axis_index = match self.axis {
            SweepAxis::Auto => Self::auto_detect_axis(bodies),
            SweepAxis::X => 0,
            SweepAxis::Y => 1,
            SweepAxis::Z => 2,
        };
        let axis = self.axis_index;

        let slots = bodies.capacity();
        let mut proxies: Vec<Option<Proxy>> = vec![None; slots];
        let mut lower = vec![0.0f32; slots];
        for &id in &self.sorted {
            if let Some(body) = bodies.get(id) {
                let proxy = Proxy::new(body, volume);
                lower[id.index()] = proxy.aabb.min[axis];
                proxies[id.index()] = Some(proxy);
            }
        }
        insertion_sort_by_key(&mut self.sorted, &lower);

        for (i, &id_a) in self.sorted.iter().enumerate() {
            let (Some(a), Some(pa)) = (bodies.get(id_a), proxies[id_a.index()]) else {
                continue;
            };
            let upper = pa.aabb.max[axis];
            for &id_b in &self.sorted[i + 1..] {
                let (Some(b), Some(pb)) = (bodies.get(id_b), proxies[id_b.index()]) else {
                    continue;
                };
                if pb.aabb.min[axis] > upper {
                    break;
                }
                if needs_broadphase_collision(a, b) && pa.overlaps(&pb, volume) {
                    push_ordered(id_a, id_b, pairs);
                }
            }
        }
        make_pairs_unique(pairs);
    }

    fn aabb_query(&self, bodies: &Arena<Body>, query: &Aabb, result: &mut Vec<BodyId>) {
        for &id in &self.sorted {
            if let Some(body) = bodies.get(id) {
                if body.aabb().overlaps(query) {
                    result.push(id);
                }
            }
        }
        // bodies added since the last sweep are not in the sorted list yet
        if self.sorted.len() != bodies.len() {
            for (id, body) in bodies.iter() {
                if !self.sorted.contains(&id) && body.aabb().overlaps(query) {
                    result.push(id);
                }
            }
        }
    }
}
