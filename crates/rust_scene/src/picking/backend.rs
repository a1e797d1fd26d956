//! Render backend seam
//!
//! The scene graph never draws. It tells a backend when the image is stale
//! and, when the backend can pick on the GPU, asks it for the broad phase.

use crate::foundation::math::Vec2;
use crate::scene::NodeId;

use super::ray::Ray;

/// Broad-phase request handed to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct BroadPhaseQuery<'a> {
    /// World-space pick ray
    pub ray: Ray,
    /// Canvas position when the pick came from the canvas
    pub canvas_pos: Option<Vec2>,
    /// Only these nodes may be hit when non-empty
    pub include: &'a [NodeId],
    /// These nodes are never hit
    pub exclude: &'a [NodeId],
}

/// Broad-phase answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadPhaseResult {
    /// The backend cannot pick; use the CPU broad phase
    Unsupported,
    /// Nothing under the ray
    Miss,
    /// Nearest Object and, for triangle geometry, the triangle index
    Hit {
        /// Object hit
        node: NodeId,
        /// Triangle within the Object's geometry
        triangle: Option<usize>,
    },
}

/// Renderer collaborator
pub trait RenderBackend {
    /// The rendered image no longer matches the scene
    fn image_dirty(&mut self);

    /// GPU broad phase. Defaults to [`BroadPhaseResult::Unsupported`].
    fn pick_candidate(&mut self, _query: &BroadPhaseQuery<'_>) -> BroadPhaseResult {
        BroadPhaseResult::Unsupported
    }
}

/// Backend that draws nothing and never picks
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl RenderBackend for NullBackend {
    fn image_dirty(&mut self) {}
}
