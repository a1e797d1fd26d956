//! Scene graph
//!
//! Nodes live in a [`slotmap`] arena owned by [`Scene`]. Groups own their
//! children downward; parents are plain handles upward.

mod attachments;
pub mod bounds;
mod factory;
mod geometry_ops;
mod hierarchy;
mod node;
pub mod pick_index;
mod registry;
mod spatial;

pub use attachments::{AttachSource, GEOMETRY_SLOT};
pub use bounds::{AABB, OBB};
pub use factory::{ComponentConfig, GeometryConfig, GroupConfig, NodeConfig, ObjectConfig, SpatialConfig};
pub use node::{Attachment, NodeBody, NodeEntry, NodeId, NodeType};
pub use registry::{Scene, SceneStats};
pub use spatial::{CascadeState, NodeFlags, RenderFlags, SpatialNode};
