//! Ray picking
//!
//! Canvas or ray input, backend or CPU broad phase, and an optional narrow
//! phase producing surface detail.

mod backend;
mod camera;
mod engine;
mod ray;

pub use backend::{BroadPhaseQuery, BroadPhaseResult, NullBackend, RenderBackend};
pub use camera::{Camera, Viewport};
pub use engine::{PickInput, PickQuery, PickResult, SurfaceHit};
pub use ray::{Ray, Triangle};
