use glam::Vec3;

use crate::utils::allocator::BodyId;

/// Notifications queued during a step and drained by the host with
/// [`World::drain_events`](crate::world::World::drain_events).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    /// First contact of a body pair that was not touching last step.
    Collide {
        body_a: BodyId,
        body_b: BodyId,
        /// Relative speed of the contact points along the normal.
        impact_speed: f32,
        point: Vec3,
        normal: Vec3,
    },
    BeginContact {
        body_a: BodyId,
        body_b: BodyId,
    },
    EndContact {
        body_a: BodyId,
        body_b: BodyId,
    },
    BeginShapeContact {
        body_a: BodyId,
        shape_a: usize,
        body_b: BodyId,
        shape_b: usize,
    },
    EndShapeContact {
        body_a: BodyId,
        shape_a: usize,
        body_b: BodyId,
        shape_b: usize,
    },
    Wakeup(BodyId),
    Sleepy(BodyId),
    Sleep(BodyId),
}

impl WorldEvent {
    /// True if the event concerns `body`.
    pub fn involves(&self, body: BodyId) -> bool {
        match *self {
            WorldEvent::Collide { body_a, body_b, .. }
            | WorldEvent::BeginContact { body_a, body_b }
            | WorldEvent::EndContact { body_a, body_b }
            | WorldEvent::BeginShapeContact { body_a, body_b, .. }
            | WorldEvent::EndShapeContact { body_a, body_b, .. } => body_a == body || body_b == body,
            WorldEvent::Wakeup(id) | WorldEvent::Sleepy(id) | WorldEvent::Sleep(id) => id == body,
        }
    }
}
