//! Typed node construction
//!
//! Every node is built from a [`NodeConfig`]. Groups build their children and
//! Objects resolve their geometry attachment as part of construction.

use crate::error::SceneError;
use crate::events::{EventKind, EventPayload};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::geometry::{GeometryArrays, GeometryBuffer, PrimitiveKind};

use super::attachments::{AttachSource, GEOMETRY_SLOT};
use super::node::{NodeBody, NodeEntry, NodeId, NodeType};
use super::spatial::{CascadeState, NodeFlags, SpatialNode};
use super::Scene;

/// Config of a plain event node
#[derive(Debug, Clone, Default)]
pub struct ComponentConfig {
    /// Requested id
    pub id: Option<String>,
}

impl ComponentConfig {
    /// Component with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}

/// Settings shared by Groups and Objects
#[derive(Debug, Clone, Default)]
pub struct SpatialConfig {
    /// Requested id
    pub id: Option<String>,
    /// Local transform
    pub transform: Transform,
    /// Initial cascading attributes
    pub state: CascadeState,
}

impl SpatialConfig {
    /// Default spatial settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: request an id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: local position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    /// Builder: local rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation;
        self
    }

    /// Builder: local scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    /// Builder: set or clear one attribute flag
    pub fn with_flag(mut self, flag: NodeFlags, value: bool) -> Self {
        self.state.flags.set(flag, value);
        self
    }

    /// Builder: colorize
    pub fn with_colorize(mut self, colorize: Vec3) -> Self {
        self.state.colorize = colorize;
        self
    }

    /// Builder: opacity, validated at creation
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.state.opacity = opacity;
        self
    }
}

/// Config of a Group
#[derive(Debug, Clone, Default)]
pub struct GroupConfig {
    /// Transform and attributes
    pub spatial: SpatialConfig,
    /// Children built and added in order
    pub children: Vec<NodeConfig>,
}

impl GroupConfig {
    /// Group with the given spatial settings
    pub fn new(spatial: SpatialConfig) -> Self {
        Self { spatial, children: Vec::new() }
    }

    /// Builder: append a child config
    pub fn with_child(mut self, child: impl Into<NodeConfig>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// Config of an Object
#[derive(Debug, Clone, Default)]
pub struct ObjectConfig {
    /// Transform and attributes
    pub spatial: SpatialConfig,
    /// Geometry to attach under the `geometry` slot
    pub geometry: Option<AttachSource>,
}

impl ObjectConfig {
    /// Object with the given spatial settings
    pub fn new(spatial: SpatialConfig) -> Self {
        Self { spatial, geometry: None }
    }

    /// Builder: geometry source
    pub fn with_geometry(mut self, source: AttachSource) -> Self {
        self.geometry = Some(source);
        self
    }
}

/// Config of a Geometry
#[derive(Debug, Clone)]
pub struct GeometryConfig {
    /// Requested id
    pub id: Option<String>,
    /// Primitive name; unknown names fall back to `triangles`
    pub primitive: String,
    /// Vertex arrays
    pub arrays: GeometryArrays,
    /// Build as combined/quantized (immutable)
    pub combined: bool,
}

impl GeometryConfig {
    /// Mutable triangle geometry
    pub fn new(arrays: GeometryArrays) -> Self {
        Self {
            id: None,
            primitive: PrimitiveKind::Triangles.as_str().to_string(),
            arrays,
            combined: false,
        }
    }

    /// Builder: request an id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: primitive name
    pub fn with_primitive(mut self, primitive: impl Into<String>) -> Self {
        self.primitive = primitive.into();
        self
    }

    /// Builder: mark as combined/quantized
    pub fn combined(mut self) -> Self {
        self.combined = true;
        self
    }
}

/// Config of any node type
#[derive(Debug, Clone)]
pub enum NodeConfig {
    /// Plain event node
    Component(ComponentConfig),
    /// Spatial container
    Group(GroupConfig),
    /// Spatial leaf
    Object(ObjectConfig),
    /// Vertex data
    Geometry(GeometryConfig),
}

impl NodeConfig {
    /// Type of node this config builds
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Component(_) => NodeType::Component,
            Self::Group(_) => NodeType::Group,
            Self::Object(_) => NodeType::Object,
            Self::Geometry(_) => NodeType::Geometry,
        }
    }
}

impl From<ComponentConfig> for NodeConfig {
    fn from(config: ComponentConfig) -> Self {
        Self::Component(config)
    }
}

impl From<GroupConfig> for NodeConfig {
    fn from(config: GroupConfig) -> Self {
        Self::Group(config)
    }
}

impl From<ObjectConfig> for NodeConfig {
    fn from(config: ObjectConfig) -> Self {
        Self::Object(config)
    }
}

impl From<GeometryConfig> for NodeConfig {
    fn from(config: GeometryConfig) -> Self {
        Self::Geometry(config)
    }
}

impl Scene {
    /// Build and register a node.
    ///
    /// Returns `None` when the config is rejected (invalid geometry arrays);
    /// the reason is reported on the error channel.
    pub fn create(&mut self, config: impl Into<NodeConfig>) -> Option<NodeId> {
        match config.into() {
            NodeConfig::Component(config) => {
                Some(self.register(config.id, NodeType::Component, NodeBody::Component))
            }
            NodeConfig::Group(config) => {
                let group = self.register_spatial(config.spatial, NodeType::Group);
                for child in config.children {
                    if let Some(child) = self.create(child) {
                        self.add_child(group, child);
                    }
                }
                Some(group)
            }
            NodeConfig::Object(config) => {
                let object = self.register_spatial(config.spatial, NodeType::Object);
                if let Some(source) = config.geometry {
                    self.attach(object, GEOMETRY_SLOT, source, NodeType::Geometry, true);
                }
                self.need_update(object);
                Some(object)
            }
            NodeConfig::Geometry(config) => {
                let (primitive, fell_back) = PrimitiveKind::parse_or_default(&config.primitive);
                match GeometryBuffer::build(primitive, config.arrays, config.combined) {
                    Ok(buffer) => {
                        let node = self.register(config.id, NodeType::Geometry, NodeBody::Geometry(buffer));
                        if fell_back {
                            self.report_error(Some(node), SceneError::InvalidValue {
                                field: "primitive",
                                message: format!("unsupported primitive '{}', using triangles", config.primitive),
                            });
                        }
                        Some(node)
                    }
                    Err(err) => {
                        self.report_error(None, err.into());
                        None
                    }
                }
            }
        }
    }

    fn register_spatial(&mut self, config: SpatialConfig, node_type: NodeType) -> NodeId {
        let mut state = config.state;
        let bad_opacity = !(0.0..=1.0).contains(&state.opacity);
        if bad_opacity {
            state.opacity = if state.opacity.is_nan() { 1.0 } else { state.opacity.clamp(0.0, 1.0) };
        }
        let node = self.register(
            config.id,
            node_type,
            NodeBody::Spatial(SpatialNode::new(config.transform, state)),
        );
        if bad_opacity {
            self.report_error(Some(node), SceneError::InvalidValue {
                field: "opacity",
                message: format!("{} is outside [0, 1], clamped", config.state.opacity),
            });
        }
        node
    }

    pub(crate) fn register(&mut self, requested: Option<String>, node_type: NodeType, body: NodeBody) -> NodeId {
        let mut duplicate = None;
        let id = match requested.filter(|id| !id.is_empty()) {
            Some(id) if !self.ids.contains_key(&id) => id,
            Some(id) => {
                let assigned = self.generate_id(node_type);
                duplicate = Some(SceneError::DuplicateId { requested: id, assigned: assigned.clone() });
                assigned
            }
            None => self.generate_id(node_type),
        };

        let node = self.nodes.insert(NodeEntry::new(id.clone(), node_type, body));
        self.ids.insert(id.clone(), node);
        if node_type == NodeType::Object {
            self.pick_index.insert(node);
        }
        if node_type.is_spatial() {
            self.scene_aabb = None;
        }
        log::debug!("Created {} '{}'", node_type, id);

        if let Some(err) = duplicate {
            self.report_error(Some(node), err);
        }
        let root = self.root;
        self.publish(root, EventKind::Created, EventPayload::Node(Some(node)), false);
        node
    }

    fn generate_id(&mut self, node_type: NodeType) -> String {
        let counter = self.id_counters.entry(node_type).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}#{}", node_type.as_str(), counter);
            if !self.ids.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}
