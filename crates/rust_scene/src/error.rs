//! Error types surfaced on the scene error channel

use crate::geometry::GeometryError;
use crate::scene::NodeType;

/// Configuration and structural errors
///
/// These never abort an operation with a panic. They are logged, published as
/// [`EventKind::Error`](crate::events::EventKind::Error) on the scene root and
/// the call falls back to a no-op or a documented default.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// No live node has this id
    #[error("node not found: {0}")]
    NotFound(String),

    /// A node of the wrong type was supplied
    #[error("type mismatch for '{name}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Attachment slot or node id being resolved
        name: String,
        /// Type the caller asked for
        expected: NodeType,
        /// Type that was supplied
        found: NodeType,
    },

    /// Requested id is already taken
    #[error("duplicate node id '{requested}', assigned '{assigned}' instead")]
    DuplicateId {
        /// Id given in the config
        requested: String,
        /// Generated replacement
        assigned: String,
    },

    /// An enumerated or ranged value was outside its domain
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Attribute name
        field: &'static str,
        /// What was wrong
        message: String,
    },

    /// Geometry arrays failed validation or were mutated while immutable
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Adding the child would create a cycle
    #[error("hierarchy cycle: cannot add '{child}' under '{parent}'")]
    HierarchyCycle {
        /// Prospective parent
        parent: String,
        /// Prospective child
        child: String,
    },

    /// Operation needs a Group or Object
    #[error("node '{0}' is not a spatial node")]
    NotSpatial(String),

    /// Canvas pick requested against a zero-sized canvas
    #[error("canvas has zero extent ({width}x{height})")]
    ZeroCanvas {
        /// Canvas width
        width: u32,
        /// Canvas height
        height: u32,
    },
}

/// Result alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
