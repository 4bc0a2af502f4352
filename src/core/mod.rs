//! Core types describing bodies, shapes, materials and constraints.

pub mod constraints;
pub mod convex;
pub mod error;
pub mod heightfield;
pub mod mesh;
pub mod rigidbody;
pub mod shape;
pub mod types;

pub use constraints::{Constraint, ConstraintId, ConstraintKind};
pub use convex::ConvexPolyhedron;
pub use error::ShapeError;
pub use heightfield::Heightfield;
pub use mesh::{Aabb, MeshBuilder, MeshBvh, Trimesh};
pub use rigidbody::{Body, BodyShape, BodyType, SleepState};
pub use shape::{CollisionFilter, Shape, ShapeGeometry, ShapeKind};
pub use types::{ContactMaterial, ContactMaterialParams, Material, MaterialId, MaterialTable, Transform};
