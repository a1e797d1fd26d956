//! Geometry storage
//!
//! Typed vertex arrays (optionally quantized), primitive kinds and the lazily
//! derived arrays picking and rendering need.

mod buffer;
mod primitive;
pub mod quantization;

pub use buffer::{GeometryArrays, GeometryBuffer, NormalData, PositionData, UvData};
pub use primitive::PrimitiveKind;

/// Geometry validation errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// An array length does not match the vertex count
    #[error("{array} has length {len}, expected {expected}")]
    InvalidLength {
        /// Array name
        array: &'static str,
        /// Actual length
        len: usize,
        /// Required length
        expected: usize,
    },

    /// An index refers past the end of the vertex arrays
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index value
        index: u32,
        /// Number of vertices
        vertex_count: usize,
    },

    /// The buffer was built combined/quantized and cannot be edited
    #[error("geometry is immutable")]
    Immutable,
}
