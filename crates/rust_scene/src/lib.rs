//! # Rust Scene
//!
//! A retained-mode 3D scene graph. Nodes are mutated incrementally and the
//! consequences are propagated lazily: boundaries are rebuilt only when read,
//! appearance updates are deferred through a cooperative scheduler, and
//! picking reads exactly the state the preceding mutations produced.
//!
//! ## Features
//!
//! - **Reactive nodes**: per-node event bus with retained payloads and named attachments
//! - **Lazy bounds**: hierarchical AABB/OBB caches with O(1) amortized invalidation
//! - **Cooperative scheduling**: FIFO task queue drained against a frame budget
//! - **Compressed geometry**: quantized positions/uvs and octahedral normals
//! - **Ray picking**: backend or CPU broad phase plus barycentric surface detail
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_scene::prelude::*;
//!
//! let mut scene = Scene::new(SceneConfig::default());
//! let triangle = scene
//!     .create(GeometryConfig::new(GeometryArrays::from_positions(vec![
//!         0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
//!     ])))
//!     .unwrap();
//! let object = scene
//!     .create(ObjectConfig::new(SpatialConfig::new().with_id("tri")).with_geometry(AttachSource::Instance(triangle)))
//!     .unwrap();
//!
//! let hit = scene.pick(
//!     PickInput::Ray { origin: Vec3::new(0.25, 0.25, 5.0), direction: Vec3::new(0.0, 0.0, -1.0) },
//!     &PickQuery::surface(),
//! );
//! assert_eq!(hit.map(|h| h.node), Some(object));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::must_use_candidate
)]

pub mod config;
pub mod error;
pub mod events;
pub mod foundation;
pub mod geometry;
pub mod picking;
pub mod scene;
pub mod scheduler;

pub use error::{SceneError, SceneResult};
pub use scene::Scene;

/// Common imports for scene users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, SceneConfig},
        error::SceneError,
        events::{Event, EventKind, EventPayload, Subscription},
        foundation::math::{Mat4, Quat, Transform, Vec2, Vec3},
        geometry::{GeometryArrays, NormalData, PositionData, PrimitiveKind, UvData},
        picking::{Camera, PickInput, PickQuery, PickResult, RenderBackend, SurfaceHit, Viewport},
        scene::{
            AttachSource, ComponentConfig, GeometryConfig, GroupConfig, NodeConfig, NodeFlags, NodeId,
            NodeType, ObjectConfig, Scene, SpatialConfig, AABB, OBB,
        },
    };
}
