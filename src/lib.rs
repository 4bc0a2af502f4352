//! Cannonball – rigid-body physics for Rust.
//!
//! A fixed-step simulator in the style of classic game physics engines:
//! sphere, plane, box, convex, cylinder, particle, heightfield and trimesh
//! shapes; naive or sweep-and-prune broadphase; SAT and clipping based
//! narrowphase; a SPOOK-regularised Gauss-Seidel solver with friction and
//! user constraints; sleeping; contact events and ray casting.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3};

pub use collision::{RaycastHit, RaycastMode, RaycastOptions};
pub use config::{BoundingVolume, BroadphaseKind, QuatNormalization, SweepAxis, WorldConfig};
pub use core::{
    Body, BodyType, CollisionFilter, Constraint, ConstraintId, ContactMaterial, ContactMaterialParams,
    ConvexPolyhedron, Heightfield, Material, MaterialId, Shape, ShapeError, ShapeKind, SleepState, Transform,
    Trimesh,
};
pub use utils::allocator::BodyId;
pub use world::{World, WorldEvent};

/// Everything a typical host needs in one import.
pub mod prelude {
    pub use crate::{
        Body, BodyId, BodyType, BroadphaseKind, Constraint, ContactMaterial, ContactMaterialParams,
        ConvexPolyhedron, Heightfield, Material, Quat, RaycastMode, RaycastOptions, Shape, SleepState, Trimesh,
        Vec3, World, WorldConfig, WorldEvent,
    };
}
