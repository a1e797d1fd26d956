//! Named attachments between nodes
//!
//! An attachment created from a config is exclusively owned and destroyed
//! together with its slot. One attached by id or instance is shared: only the
//! listeners the owner registered on it are released.

use crate::error::SceneError;
use crate::events::{EventKind, EventPayload};

use super::factory::NodeConfig;
use super::node::{Attachment, NodeId, NodeType};
use super::Scene;

/// Slot an Object's geometry lives in
pub const GEOMETRY_SLOT: &str = "geometry";

/// Where an attached node comes from
#[derive(Debug, Clone)]
pub enum AttachSource {
    /// Existing node looked up by id (shared)
    Id(String),
    /// New node built from a config (exclusively owned)
    Config(Box<NodeConfig>),
    /// Existing node by handle (shared)
    Instance(NodeId),
}

impl From<NodeId> for AttachSource {
    fn from(node: NodeId) -> Self {
        Self::Instance(node)
    }
}

impl From<NodeConfig> for AttachSource {
    fn from(config: NodeConfig) -> Self {
        Self::Config(Box::new(config))
    }
}

impl Scene {
    /// Attach a node to `owner` under `name`.
    ///
    /// The resolved node must be of `expected` type. With `cascade_on_dirty`
    /// a `Dirty` event from the attached node marks a spatial owner's boundary
    /// dirty, queues its appearance update and requests a redraw; other owners
    /// re-publish `Dirty`. Returns the attached node, or `None` after reporting
    /// a configuration error.
    pub fn attach(
        &mut self,
        owner: NodeId,
        name: &str,
        source: AttachSource,
        expected: NodeType,
        cascade_on_dirty: bool,
    ) -> Option<NodeId> {
        if !self.is_alive(owner) {
            self.report_error(None, SceneError::NotFound(format!("{owner:?}")));
            return None;
        }

        let (child, owned) = match source {
            AttachSource::Id(id) => match self.find(&id) {
                Some(child) => (child, false),
                None => {
                    self.report_error(Some(owner), SceneError::NotFound(id));
                    return None;
                }
            },
            AttachSource::Instance(child) => {
                if !self.is_alive(child) {
                    self.report_error(Some(owner), SceneError::NotFound(format!("{child:?}")));
                    return None;
                }
                (child, false)
            }
            AttachSource::Config(config) => {
                let found = config.node_type();
                if found != expected {
                    self.report_error(Some(owner), SceneError::TypeMismatch { name: name.to_string(), expected, found });
                    return None;
                }
                (self.create(*config)?, true)
            }
        };

        let found = self.node_type(child)?;
        if found != expected {
            self.report_error(Some(owner), SceneError::TypeMismatch { name: name.to_string(), expected, found });
            return None;
        }

        if self.attachment(owner, name) == Some(child) {
            return Some(child);
        }
        self.release_attachment(owner, name);

        let mut subscriptions = Vec::new();
        let slot = name.to_string();
        subscriptions.extend(self.subscribe(child, EventKind::Destroyed, move |scene, event| {
            scene.on_attachment_destroyed(owner, &slot, event.source);
        }));
        if cascade_on_dirty {
            subscriptions.extend(self.subscribe(child, EventKind::Dirty, move |scene, _| {
                scene.on_attachment_dirty(owner);
            }));
        }

        if let Some(entry) = self.nodes.get_mut(owner) {
            entry.attachments.insert(name.to_string(), Attachment { child, owned, subscriptions });
        }
        log::debug!(
            "Attached '{}' to '{}' as {}",
            self.id_of(child).unwrap_or("?"),
            self.id_of(owner).unwrap_or("?"),
            name
        );
        self.attachment_changed(owner, name, Some(child));
        Some(child)
    }

    /// Remove the attachment under `name`, destroying it when owned.
    ///
    /// Returns the node that was attached.
    pub fn detach(&mut self, owner: NodeId, name: &str) -> Option<NodeId> {
        let child = self.release_attachment(owner, name)?;
        self.attachment_changed(owner, name, None);
        Some(child)
    }

    /// Node currently attached under `name`
    pub fn attachment(&self, owner: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(owner)?.attachments.get(name).map(|a| a.child)
    }

    /// Whether the attachment under `name` is exclusively owned
    pub fn is_attachment_owned(&self, owner: NodeId, name: &str) -> Option<bool> {
        self.nodes.get(owner)?.attachments.get(name).map(|a| a.owned)
    }

    /// Geometry attached to an Object
    pub fn object_geometry(&self, object: NodeId) -> Option<NodeId> {
        self.attachment(object, GEOMETRY_SLOT)
    }

    /// Attach (or replace) an Object's geometry
    pub fn set_object_geometry(&mut self, object: NodeId, source: impl Into<AttachSource>) -> Option<NodeId> {
        self.attach(object, GEOMETRY_SLOT, source.into(), NodeType::Geometry, true)
    }

    /// Unsubscribe first, then destroy an owned child
    fn release_attachment(&mut self, owner: NodeId, name: &str) -> Option<NodeId> {
        let attachment = self.nodes.get_mut(owner)?.attachments.remove(name)?;
        for subscription in &attachment.subscriptions {
            self.unsubscribe(subscription);
        }
        if attachment.owned {
            self.destroy(attachment.child);
        }
        Some(attachment.child)
    }

    fn attachment_changed(&mut self, owner: NodeId, name: &str, child: Option<NodeId>) {
        if self.nodes.get(owner).map_or(true, |e| e.destroyed) {
            return;
        }
        if name == GEOMETRY_SLOT {
            self.publish(owner, EventKind::Geometry, EventPayload::Node(child), false);
        }
        if self.spatial(owner).is_some() {
            self.mark_boundary_dirty(owner);
            self.need_update(owner);
        }
    }

    fn on_attachment_destroyed(&mut self, owner: NodeId, name: &str, child: NodeId) {
        if self.attachment(owner, name) != Some(child) {
            return;
        }
        if let Some(attachment) = self.nodes.get_mut(owner).and_then(|e| e.attachments.remove(name)) {
            for subscription in &attachment.subscriptions {
                self.unsubscribe(subscription);
            }
        }
        log::debug!("Attachment '{}' of '{}' was destroyed", name, self.id_of(owner).unwrap_or("?"));
        self.attachment_changed(owner, name, None);
    }

    fn on_attachment_dirty(&mut self, owner: NodeId) {
        if self.spatial(owner).is_some() {
            self.mark_boundary_dirty(owner);
            self.need_update(owner);
            self.request_redraw();
        } else {
            self.publish(owner, EventKind::Dirty, EventPayload::None, false);
        }
    }
}
