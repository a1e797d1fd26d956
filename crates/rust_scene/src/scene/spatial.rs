//! Spatial node state: hierarchy links, transforms, bounds caches and
//! cascading attributes.

use bitflags::bitflags;

use crate::foundation::math::{Mat4, Transform, Vec3};

use super::bounds::{AABB, OBB};
use super::NodeId;

bitflags! {
    /// Cascading boolean attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        /// Drawn
        const VISIBLE     = 1 << 0;
        /// Hidden by culling
        const CULLED      = 1 << 1;
        /// Considered by picking
        const PICKABLE    = 1 << 2;
        /// Affected by section planes
        const CLIPPABLE   = 1 << 3;
        /// Contributes to parent boundaries
        const COLLIDABLE  = 1 << 4;
        /// Drawn with the selection effect
        const SELECTED    = 1 << 5;
        /// Drawn with the highlight effect
        const HIGHLIGHTED = 1 << 6;
        /// Drawn with an outline
        const OUTLINED    = 1 << 7;
        /// Drawn ghosted
        const GHOSTED     = 1 << 8;
    }
}

impl NodeFlags {
    /// Flags a freshly created spatial node starts with
    pub fn initial() -> Self {
        Self::VISIBLE | Self::PICKABLE | Self::CLIPPABLE | Self::COLLIDABLE
    }

    /// Flags whose change alters how an Object is drawn
    pub fn appearance() -> Self {
        Self::VISIBLE
            | Self::CULLED
            | Self::CLIPPABLE
            | Self::SELECTED
            | Self::HIGHLIGHTED
            | Self::OUTLINED
            | Self::GHOSTED
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::initial()
    }
}

bitflags! {
    /// Render passes an Object participates in, recomputed by the deferred appearance update
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u8 {
        /// Has geometry and is visible and not culled
        const DRAWABLE     = 1 << 0;
        /// Opacity below one
        const TRANSPARENT  = 1 << 1;
        /// Ghosted pass
        const GHOSTED      = 1 << 2;
        /// Highlight pass
        const HIGHLIGHTED  = 1 << 3;
        /// Selection pass
        const SELECTED     = 1 << 4;
        /// Outline pass
        const OUTLINED     = 1 << 5;
    }
}

/// Cascading attribute values copied down a subtree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeState {
    /// Boolean attributes
    pub flags: NodeFlags,
    /// RGB multiplier
    pub colorize: Vec3,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
}

impl Default for CascadeState {
    fn default() -> Self {
        Self {
            flags: NodeFlags::initial(),
            colorize: Vec3::repeat(1.0),
            opacity: 1.0,
        }
    }
}

/// Per-node state shared by Groups and Objects
#[derive(Debug, Clone)]
pub struct SpatialNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) transform: Transform,
    pub(crate) local_matrix: Mat4,
    pub(crate) world_matrix: Mat4,
    pub(crate) world_dirty: bool,
    pub(crate) aabb: AABB,
    pub(crate) aabb_dirty: bool,
    pub(crate) obb: OBB,
    pub(crate) obb_dirty: bool,
    pub(crate) state: CascadeState,
    pub(crate) update_scheduled: bool,
    pub(crate) render_flags: RenderFlags,
}

impl SpatialNode {
    /// New detached node with the given local transform and attributes
    pub fn new(transform: Transform, state: CascadeState) -> Self {
        let local_matrix = transform.to_matrix();
        Self {
            parent: None,
            children: Vec::new(),
            transform,
            local_matrix,
            world_matrix: Mat4::identity(),
            world_dirty: true,
            aabb: AABB::empty(),
            aabb_dirty: true,
            obb: OBB::default(),
            obb_dirty: true,
            state,
            update_scheduled: false,
            render_flags: RenderFlags::empty(),
        }
    }

    /// Parent node, if any
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Local TRS. Stale after [`Scene::set_local_matrix`](crate::scene::Scene::set_local_matrix).
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Local matrix
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    /// Cascading attribute values
    pub fn state(&self) -> &CascadeState {
        &self.state
    }

    /// Boolean attributes
    pub fn flags(&self) -> NodeFlags {
        self.state.flags
    }

    /// Whether either boundary cache needs a rebuild
    pub fn is_boundary_dirty(&self) -> bool {
        self.aabb_dirty || self.obb_dirty
    }

    /// Whether the cached world matrix needs a rebuild
    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty
    }

    /// Last computed render summary
    pub fn render_flags(&self) -> RenderFlags {
        self.render_flags
    }

    /// Whether an appearance update is queued
    pub fn is_update_scheduled(&self) -> bool {
        self.update_scheduled
    }

    /// Pickable, visible and not culled
    pub fn is_pick_candidate(&self) -> bool {
        let flags = self.state.flags;
        flags.contains(NodeFlags::PICKABLE | NodeFlags::VISIBLE) && !flags.contains(NodeFlags::CULLED)
    }
}
