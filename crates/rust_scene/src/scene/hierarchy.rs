//! Spatial hierarchy: parenting, transforms, lazy bounds and cascading
//! attributes.
//!
//! Boundaries are rebuilt only when read. Marking a node dirty walks its
//! ancestors and stops at the first one that is already dirty, so every dirty
//! node has dirty ancestors and repeated mutations cost O(1) amortized.

use crate::error::SceneError;
use crate::events::{EventKind, EventPayload};
use crate::foundation::math::{Mat4, Quat, Transform, Vec3};

use super::bounds::{AABB, OBB};
use super::node::{NodeId, NodeType};
use super::spatial::{CascadeState, NodeFlags, RenderFlags};
use super::Scene;

impl Scene {
    fn check_spatial(&mut self, node: NodeId) -> bool {
        match self.nodes.get(node) {
            Some(entry) if entry.spatial().is_some() => true,
            Some(entry) => {
                let id = entry.id.clone();
                self.report_error(Some(node), SceneError::NotSpatial(id));
                false
            }
            None => {
                self.report_error(None, SceneError::NotFound(format!("{node:?}")));
                false
            }
        }
    }

    /// Parent of a spatial node
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.spatial(node)?.parent
    }

    /// Children of a spatial node, in order
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.spatial(node) {
            Some(spatial) => &spatial.children,
            None => &[],
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// `node` and all its descendants, depth-first pre-order
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Make `child` the last child of `parent`.
    ///
    /// The child leaves any previous parent first and takes on the parent's
    /// cascading attributes. Only Groups accept children.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.check_spatial(parent) || !self.check_spatial(child) {
            return false;
        }
        let parent_type = self.node_type(parent).unwrap_or(NodeType::Component);
        if parent_type != NodeType::Group {
            self.report_error(Some(parent), SceneError::TypeMismatch {
                name: "parent".to_string(),
                expected: NodeType::Group,
                found: parent_type,
            });
            return false;
        }
        if self.is_ancestor(child, parent) {
            let err = SceneError::HierarchyCycle {
                parent: self.id_of(parent).unwrap_or("?").to_string(),
                child: self.id_of(child).unwrap_or("?").to_string(),
            };
            self.report_error(Some(child), err);
            return false;
        }
        if self.parent(child) == Some(parent) {
            return true;
        }
        if let Some(old) = self.parent(child) {
            self.unlink(old, child);
        }

        if let Some(spatial) = self.spatial_mut(parent) {
            spatial.children.push(child);
        }
        if let Some(spatial) = self.spatial_mut(child) {
            spatial.parent = Some(parent);
        }
        self.mark_world_dirty(child);
        self.mark_boundary_dirty(child);

        let inherited = self.spatial(parent).map(|s| s.state).unwrap_or_default();
        self.cascade(child, |state| *state = inherited);

        self.publish(child, EventKind::Parent, EventPayload::Node(Some(parent)), true);
        self.request_redraw();
        true
    }

    /// Detach `child` from `parent`, making it a root
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            self.report_error(Some(parent), SceneError::InvalidValue {
                field: "child",
                message: format!("'{}' is not a child", self.id_of(child).unwrap_or("?")),
            });
            return false;
        }
        self.unlink(parent, child);
        self.publish(child, EventKind::Parent, EventPayload::Node(None), true);
        self.request_redraw();
        true
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(spatial) = self.spatial_mut(parent) {
            spatial.children.retain(|c| *c != child);
        }
        if let Some(spatial) = self.spatial_mut(child) {
            spatial.parent = None;
        }
        self.mark_boundary_dirty(parent);
        self.mark_world_dirty(child);
        self.mark_boundary_dirty(child);
    }

    // ---- transforms --------------------------------------------------

    /// Set the local position
    pub fn set_position(&mut self, node: NodeId, position: Vec3) {
        self.update_transform(node, |t| t.position = position);
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, node: NodeId, rotation: Quat) {
        self.update_transform(node, |t| t.rotation = rotation);
    }

    /// Set the local scale
    pub fn set_scale(&mut self, node: NodeId, scale: Vec3) {
        self.update_transform(node, |t| t.scale = scale);
    }

    /// Replace the whole local transform
    pub fn set_transform(&mut self, node: NodeId, transform: Transform) {
        self.update_transform(node, |t| *t = transform);
    }

    fn update_transform(&mut self, node: NodeId, update: impl FnOnce(&mut Transform)) {
        if !self.check_spatial(node) {
            return;
        }
        if let Some(spatial) = self.spatial_mut(node) {
            update(&mut spatial.transform);
            spatial.local_matrix = spatial.transform.to_matrix();
        }
        self.local_matrix_changed(node);
    }

    /// Set the local matrix directly. The stored TRS is left untouched.
    pub fn set_local_matrix(&mut self, node: NodeId, matrix: Mat4) {
        if !self.check_spatial(node) {
            return;
        }
        if let Some(spatial) = self.spatial_mut(node) {
            spatial.local_matrix = matrix;
        }
        self.local_matrix_changed(node);
    }

    fn local_matrix_changed(&mut self, node: NodeId) {
        self.mark_world_dirty(node);
        self.mark_boundary_dirty(node);
        self.publish(node, EventKind::Matrix, EventPayload::None, false);
        self.request_redraw();
    }

    /// World matrix, rebuilt from ancestors if dirty
    pub fn world_matrix(&mut self, node: NodeId) -> Option<Mat4> {
        let spatial = self.spatial(node)?;
        if !spatial.world_dirty {
            return Some(spatial.world_matrix);
        }
        let local = spatial.local_matrix;
        let parent = spatial.parent;
        let parent_world = match parent {
            Some(parent) => self.world_matrix(parent).unwrap_or_else(Mat4::identity),
            None => Mat4::identity(),
        };
        let world = parent_world * local;
        let spatial = self.spatial_mut(node)?;
        spatial.world_matrix = world;
        spatial.world_dirty = false;
        Some(world)
    }

    /// Mark `node` and its descendants world-dirty, along with their boundaries.
    ///
    /// Descent stops at descendants that are already world-dirty.
    pub(crate) fn mark_world_dirty(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let is_object = self.node_type(n) == Some(NodeType::Object);
            let Some(spatial) = self.spatial_mut(n) else { continue };
            if spatial.world_dirty && n != node {
                continue;
            }
            spatial.world_dirty = true;
            spatial.aabb_dirty = true;
            spatial.obb_dirty = true;
            stack.extend(spatial.children.iter().copied());
            if is_object {
                self.pick_index.invalidate(n);
            }
        }
        self.scene_aabb = None;
    }

    /// Mark the boundary of `node` dirty and walk its ancestors, stopping at
    /// the first one already dirty.
    pub fn mark_boundary_dirty(&mut self, node: NodeId) {
        let is_object = self.node_type(node) == Some(NodeType::Object);
        let Some(spatial) = self.spatial_mut(node) else {
            return;
        };
        spatial.aabb_dirty = true;
        spatial.obb_dirty = true;
        let mut next = spatial.parent;
        if is_object {
            self.pick_index.invalidate(node);
        }
        self.scene_aabb = None;

        while let Some(ancestor) = next {
            let Some(spatial) = self.spatial_mut(ancestor) else { break };
            if spatial.aabb_dirty && spatial.obb_dirty {
                break;
            }
            spatial.aabb_dirty = true;
            spatial.obb_dirty = true;
            next = spatial.parent;
        }
    }

    // ---- bounds ------------------------------------------------------

    /// World-space AABB, rebuilt if dirty. Empty when nothing collidable is below.
    pub fn aabb(&mut self, node: NodeId) -> Option<AABB> {
        self.ensure_boundary(node)?;
        self.spatial(node).map(|s| s.aabb)
    }

    /// World-space OBB, rebuilt if dirty
    pub fn obb(&mut self, node: NodeId) -> Option<OBB> {
        self.ensure_boundary(node)?;
        self.spatial(node).map(|s| s.obb)
    }

    fn ensure_boundary(&mut self, node: NodeId) -> Option<()> {
        let node_type = self.node_type(node)?;
        let spatial = self.spatial(node)?;
        if !spatial.aabb_dirty && !spatial.obb_dirty {
            return Some(());
        }

        let (aabb, obb) = match node_type {
            NodeType::Group => {
                let children = spatial.children.clone();
                let mut aabb = AABB::empty();
                let mut collidable = 0;
                let mut last_obb = None;
                for child in children {
                    let is_collidable = self
                        .spatial(child)
                        .is_some_and(|s| s.state.flags.contains(NodeFlags::COLLIDABLE));
                    if !is_collidable {
                        continue;
                    }
                    self.ensure_boundary(child);
                    if let Some(s) = self.spatial(child) {
                        aabb = aabb.union(&s.aabb);
                        last_obb = Some(s.obb);
                        collidable += 1;
                    }
                }
                let obb = match (collidable, last_obb) {
                    (1, Some(single)) => single,
                    _ => OBB::from_aabb(&aabb),
                };
                (aabb, obb)
            }
            NodeType::Object => {
                let world = self.world_matrix(node)?;
                let local = self
                    .object_geometry(node)
                    .and_then(|g| self.geometry_mut(g))
                    .map_or_else(AABB::empty, |g| g.local_aabb());
                let obb = OBB::from_local_aabb(&local, &world);
                let aabb = if local.is_empty() { AABB::empty() } else { obb.aabb() };
                (aabb, obb)
            }
            _ => return None,
        };

        let spatial = self.spatial_mut(node)?;
        spatial.aabb = aabb;
        spatial.obb = obb;
        spatial.aabb_dirty = false;
        spatial.obb_dirty = false;
        self.stats.boundary_rebuilds += 1;
        log::trace!("Rebuilt boundary of '{}'", self.id_of(node).unwrap_or("?"));
        self.publish(node, EventKind::Boundary, EventPayload::Aabb(aabb), false);
        Some(())
    }

    /// Union of every collidable Object's AABB, cached until any boundary changes
    pub fn scene_aabb(&mut self) -> AABB {
        if let Some(aabb) = self.scene_aabb {
            return aabb;
        }
        let mut aabb = AABB::empty();
        for object in self.objects() {
            let collidable = self
                .spatial(object)
                .is_some_and(|s| s.state.flags.contains(NodeFlags::COLLIDABLE));
            if collidable {
                if let Some(b) = self.aabb(object) {
                    aabb = aabb.union(&b);
                }
            }
        }
        self.scene_aabb = Some(aabb);
        aabb
    }

    /// Union of the AABBs of the given nodes
    pub fn aabb_of(&mut self, nodes: &[NodeId]) -> AABB {
        nodes
            .iter()
            .filter_map(|n| self.aabb(*n))
            .fold(AABB::empty(), |acc, b| acc.union(&b))
    }

    // ---- cascading attributes ----------------------------------------

    /// Cascading attribute values of a node
    pub fn cascade_state(&self, node: NodeId) -> Option<CascadeState> {
        self.spatial(node).map(|s| s.state)
    }

    /// Whether a flag is set on a node
    pub fn flag(&self, node: NodeId, flag: NodeFlags) -> Option<bool> {
        self.spatial(node).map(|s| s.state.flags.contains(flag))
    }

    /// Set one flag on `node` and overwrite it on every descendant
    pub fn set_flag(&mut self, node: NodeId, flag: NodeFlags, value: bool) {
        if self.check_spatial(node) {
            self.cascade(node, |state| state.flags.set(flag, value));
            self.request_redraw();
        }
    }

    /// Cascading `visible`
    pub fn set_visible(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::VISIBLE, value);
    }

    /// Cascading `culled`
    pub fn set_culled(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::CULLED, value);
    }

    /// Cascading `pickable`
    pub fn set_pickable(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::PICKABLE, value);
    }

    /// Cascading `clippable`
    pub fn set_clippable(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::CLIPPABLE, value);
    }

    /// Cascading `collidable`
    pub fn set_collidable(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::COLLIDABLE, value);
    }

    /// Cascading `selected`
    pub fn set_selected(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::SELECTED, value);
    }

    /// Cascading `highlighted`
    pub fn set_highlighted(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::HIGHLIGHTED, value);
    }

    /// Cascading `outlined`
    pub fn set_outlined(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::OUTLINED, value);
    }

    /// Cascading `ghosted`
    pub fn set_ghosted(&mut self, node: NodeId, value: bool) {
        self.set_flag(node, NodeFlags::GHOSTED, value);
    }

    /// Cascading RGB multiplier
    pub fn set_colorize(&mut self, node: NodeId, colorize: Vec3) {
        if self.check_spatial(node) {
            self.cascade(node, |state| state.colorize = colorize);
            self.request_redraw();
        }
    }

    /// Cascading opacity; values outside `[0, 1]` are reported and clamped
    pub fn set_opacity(&mut self, node: NodeId, opacity: f32) {
        if !self.check_spatial(node) {
            return;
        }
        let value = if (0.0..=1.0).contains(&opacity) {
            opacity
        } else {
            self.report_error(Some(node), SceneError::InvalidValue {
                field: "opacity",
                message: format!("{opacity} is outside [0, 1], clamped"),
            });
            if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) }
        };
        self.cascade(node, |state| state.opacity = value);
        self.request_redraw();
    }

    /// Apply `update` to the subtree, publishing one retained event per changed attribute
    fn cascade(&mut self, node: NodeId, update: impl Fn(&mut CascadeState)) {
        for n in self.subtree(node) {
            let Some(spatial) = self.spatial_mut(n) else { continue };
            let before = spatial.state;
            update(&mut spatial.state);
            let after = spatial.state;
            let parent = spatial.parent;
            if before == after {
                continue;
            }

            for flag in NodeFlags::all().iter() {
                let value = after.flags.contains(flag);
                if before.flags.contains(flag) != value {
                    if let Some(kind) = EventKind::for_flag(flag) {
                        self.publish(n, kind, EventPayload::Bool(value), true);
                    }
                }
            }
            if before.colorize != after.colorize {
                self.publish(n, EventKind::Colorize, EventPayload::Color(after.colorize), true);
            }
            if before.opacity != after.opacity {
                self.publish(n, EventKind::Opacity, EventPayload::Number(after.opacity), true);
            }
            if before.flags.contains(NodeFlags::COLLIDABLE) != after.flags.contains(NodeFlags::COLLIDABLE) {
                self.scene_aabb = None;
                if let Some(parent) = parent {
                    self.mark_boundary_dirty(parent);
                }
            }
            self.need_update(n);
        }
    }

    // ---- deferred appearance -----------------------------------------

    /// Queue an appearance update for an Object unless one is pending
    pub fn need_update(&mut self, node: NodeId) {
        if self.node_type(node) != Some(NodeType::Object) {
            return;
        }
        let Some(spatial) = self.spatial_mut(node) else { return };
        if spatial.update_scheduled {
            return;
        }
        spatial.update_scheduled = true;
        self.schedule(Some(node), move |scene| scene.update_appearance(node));
    }

    fn update_appearance(&mut self, node: NodeId) {
        let has_geometry = self.object_geometry(node).is_some();
        let Some(spatial) = self.spatial_mut(node) else { return };
        spatial.update_scheduled = false;

        let flags = spatial.state.flags;
        let mut render = RenderFlags::empty();
        render.set(
            RenderFlags::DRAWABLE,
            has_geometry && flags.contains(NodeFlags::VISIBLE) && !flags.contains(NodeFlags::CULLED),
        );
        render.set(RenderFlags::TRANSPARENT, spatial.state.opacity < 1.0);
        render.set(RenderFlags::GHOSTED, flags.contains(NodeFlags::GHOSTED));
        render.set(RenderFlags::HIGHLIGHTED, flags.contains(NodeFlags::HIGHLIGHTED));
        render.set(RenderFlags::SELECTED, flags.contains(NodeFlags::SELECTED));
        render.set(RenderFlags::OUTLINED, flags.contains(NodeFlags::OUTLINED));
        spatial.render_flags = render;

        log::trace!("Appearance of '{}' is now {:?}", self.id_of(node).unwrap_or("?"), render);
        self.request_redraw();
    }
}
