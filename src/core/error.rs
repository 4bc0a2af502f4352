use thiserror::Error;

/// Invalid geometry handed to a shape constructor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("{what} must be finite and positive, got {value}")]
    InvalidDimension { what: &'static str, value: f32 },
    #[error("shape needs at least {required} vertices, got {actual}")]
    TooFewVertices { required: usize, actual: usize },
    #[error("vertex {index} is not finite")]
    NonFiniteVertex { index: usize },
    #[error("convex polyhedron has no faces")]
    NoFaces,
    #[error("face {face} has {count} vertices; at least 3 are required")]
    FaceTooSmall { face: usize, count: usize },
    #[error("face {face} references vertex {vertex}, but only {len} vertices exist")]
    VertexOutOfRange { face: usize, vertex: usize, len: usize },
    #[error("face {face} has zero area")]
    DegenerateFace { face: usize },
    #[error("heightfield needs at least 2x2 samples, got {rows}x{cols}")]
    HeightfieldTooSmall { rows: usize, cols: usize },
    #[error("heightfield row {row} has {len} samples, expected {expected}")]
    RaggedHeightfield { row: usize, len: usize, expected: usize },
    #[error("heightfield sample ({row}, {col}) is not finite")]
    NonFiniteHeight { row: usize, col: usize },
    #[error("cylinder needs at least 3 segments, got {0}")]
    TooFewSegments(usize),
}
