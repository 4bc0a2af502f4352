//! Utility helpers: generational arena, math extensions, logging timers and profiling.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{Arena, BodyId};
pub use profiling::StepProfiler;
