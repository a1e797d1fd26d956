//! Node identity and storage

use std::collections::BTreeMap;
use std::fmt;

use crate::events::{EventBus, Subscription};
use crate::geometry::GeometryBuffer;

use super::spatial::SpatialNode;
use super::Scene;

slotmap::new_key_type! {
    /// Arena handle of a node
    pub struct NodeId;
}

/// Concrete node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    /// Plain event node without spatial state
    Component,
    /// Spatial container
    Group,
    /// Spatial leaf drawing a geometry
    Object,
    /// Vertex data shared by Objects
    Geometry,
}

impl NodeType {
    /// Lowercase name, also used as the prefix of generated ids
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Group => "group",
            Self::Object => "object",
            Self::Geometry => "geometry",
        }
    }

    /// Whether the type carries [`SpatialNode`] state
    pub fn is_spatial(self) -> bool {
        matches!(self, Self::Group | Self::Object)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific node state
#[derive(Debug)]
pub enum NodeBody {
    /// No extra state
    Component,
    /// Group or Object
    Spatial(SpatialNode),
    /// Vertex data
    Geometry(GeometryBuffer),
}

/// A named link from an owner node to another node
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Attached node
    pub child: NodeId,
    /// Created from a config, so destroyed together with the slot
    pub owned: bool,
    pub(crate) subscriptions: Vec<Subscription>,
}

/// Everything the arena stores for one node
#[derive(Debug)]
pub struct NodeEntry {
    pub(crate) id: String,
    pub(crate) node_type: NodeType,
    pub(crate) bus: EventBus<Scene>,
    pub(crate) attachments: BTreeMap<String, Attachment>,
    pub(crate) destroyed: bool,
    pub(crate) body: NodeBody,
}

impl NodeEntry {
    pub(crate) fn new(id: String, node_type: NodeType, body: NodeBody) -> Self {
        Self {
            id,
            node_type,
            bus: EventBus::new(),
            attachments: BTreeMap::new(),
            destroyed: false,
            body,
        }
    }

    /// String id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Node type
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Attachment slots by name
    pub fn attachments(&self) -> &BTreeMap<String, Attachment> {
        &self.attachments
    }

    /// Spatial state, for Groups and Objects
    pub fn spatial(&self) -> Option<&SpatialNode> {
        match &self.body {
            NodeBody::Spatial(spatial) => Some(spatial),
            _ => None,
        }
    }

    pub(crate) fn spatial_mut(&mut self) -> Option<&mut SpatialNode> {
        match &mut self.body {
            NodeBody::Spatial(spatial) => Some(spatial),
            _ => None,
        }
    }

    /// Geometry buffer, for Geometry nodes
    pub fn geometry(&self) -> Option<&GeometryBuffer> {
        match &self.body {
            NodeBody::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    pub(crate) fn geometry_mut(&mut self) -> Option<&mut GeometryBuffer> {
        match &mut self.body {
            NodeBody::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }
}
