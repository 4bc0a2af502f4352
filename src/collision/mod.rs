//! Collision detection: broad-phase, narrow-phase routines, overlap tracking, ray casts.

pub mod broadphase;
pub mod clipping;
pub mod contact;
pub mod narrowphase;
pub mod overlap;
pub mod queries;
pub mod routines;
pub mod sat;

pub use broadphase::{make_broadphase, BroadPhase, NaiveBroadphase, SweepAndPrune};
pub use contact::{ContactPoint, FrictionPoint, RawContact};
pub use narrowphase::{NarrowPhase, NarrowphaseOutput, ShapePairKey};
pub use overlap::OverlapKeeper;
pub use queries::{Ray, RaycastHit, RaycastMode, RaycastOptions};
