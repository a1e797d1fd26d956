//! Geometry buffer with lazily derived arrays

use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::scene::bounds::AABB;

use super::quantization::{decode_position, decode_uv, oct_decode};
use super::{GeometryError, PrimitiveKind};

/// Vertex positions
#[derive(Debug, Clone, PartialEq)]
pub enum PositionData {
    /// Flat `xyz` floats
    Float(Vec<f32>),
    /// Flat `xyz` lattice coordinates plus decode matrix
    Quantized {
        /// Quantized coordinates
        data: Vec<u16>,
        /// Lattice to model space
        decode: Mat4,
    },
}

impl PositionData {
    fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Quantized { data, .. } => data.len(),
        }
    }
}

/// Vertex normals
#[derive(Debug, Clone, PartialEq)]
pub enum NormalData {
    /// Flat `xyz` floats
    Float(Vec<f32>),
    /// Two octahedral `i8` coordinates per vertex
    Oct(Vec<i8>),
}

impl NormalData {
    fn check(&self, vertex_count: usize) -> Result<(), GeometryError> {
        let (len, expected) = match self {
            Self::Float(v) => (v.len(), vertex_count * 3),
            Self::Oct(v) => (v.len(), vertex_count * 2),
        };
        check_len("normals", len, expected)
    }
}

/// Vertex texture coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum UvData {
    /// Flat `uv` floats
    Float(Vec<f32>),
    /// Flat `uv` lattice coordinates plus decode matrix
    Quantized {
        /// Quantized coordinates
        data: Vec<u16>,
        /// Lattice to texture space
        decode: Mat3,
    },
}

impl UvData {
    fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Quantized { data, .. } => data.len(),
        }
    }
}

/// Raw arrays a geometry is built from
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryArrays {
    /// Vertex positions (required)
    pub positions: PositionData,
    /// Vertex normals
    pub normals: Option<NormalData>,
    /// Vertex texture coordinates
    pub uvs: Option<UvData>,
    /// Element indices. Without them vertices are consumed in order.
    pub indices: Option<Vec<u32>>,
}

impl GeometryArrays {
    /// Arrays holding only float positions
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Self {
            positions: PositionData::Float(positions),
            normals: None,
            uvs: None,
            indices: None,
        }
    }

    /// Builder: set normals
    pub fn with_normals(mut self, normals: NormalData) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Builder: set uvs
    pub fn with_uvs(mut self, uvs: UvData) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Builder: set indices
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

fn check_len(array: &'static str, len: usize, expected: usize) -> Result<(), GeometryError> {
    if len == expected {
        Ok(())
    } else {
        Err(GeometryError::InvalidLength { array, len, expected })
    }
}

fn validate(primitive: PrimitiveKind, arrays: &GeometryArrays) -> Result<(), GeometryError> {
    let position_len = arrays.positions.len();
    check_len("positions", position_len, position_len - position_len % 3)?;
    let vertex_count = arrays.vertex_count();

    if let Some(normals) = &arrays.normals {
        normals.check(vertex_count)?;
    }
    if let Some(uvs) = &arrays.uvs {
        check_len("uvs", uvs.len(), vertex_count * 2)?;
    }
    if let Some(indices) = &arrays.indices {
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GeometryError::IndexOutOfRange { index, vertex_count });
        }
    }
    if primitive == PrimitiveKind::Triangles {
        match &arrays.indices {
            Some(indices) => check_len("indices", indices.len(), indices.len() - indices.len() % 3)?,
            None => check_len("positions", position_len, position_len - position_len % 9)?,
        }
    }
    Ok(())
}

/// Vertex arrays plus their lazily derived caches
///
/// A buffer built as `combined` is immutable: every setter fails with
/// [`GeometryError::Immutable`]. Otherwise any array may be replaced, which
/// drops the local AABB, tangents and pick triangle caches.
#[derive(Debug, Clone)]
pub struct GeometryBuffer {
    primitive: PrimitiveKind,
    arrays: GeometryArrays,
    combined: bool,
    local_aabb: Option<AABB>,
    tangents: Option<Vec<Vec4>>,
    pick_positions: Option<Vec<Vec3>>,
}

impl GeometryBuffer {
    /// Validate arrays and build a buffer
    pub fn build(primitive: PrimitiveKind, arrays: GeometryArrays, combined: bool) -> Result<Self, GeometryError> {
        validate(primitive, &arrays)?;
        Ok(Self {
            primitive,
            arrays,
            combined,
            local_aabb: None,
            tangents: None,
            pick_positions: None,
        })
    }

    /// Primitive kind
    pub fn primitive(&self) -> PrimitiveKind {
        self.primitive
    }

    /// Whether the buffer is combined/quantized and therefore immutable
    pub fn is_combined(&self) -> bool {
        self.combined
    }

    /// Raw arrays
    pub fn arrays(&self) -> &GeometryArrays {
        &self.arrays
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.arrays.vertex_count()
    }

    fn ensure_mutable(&self) -> Result<(), GeometryError> {
        if self.combined { Err(GeometryError::Immutable) } else { Ok(()) }
    }

    fn invalidate(&mut self) {
        self.local_aabb = None;
        self.tangents = None;
        self.pick_positions = None;
    }

    fn swap_arrays(&mut self, arrays: GeometryArrays) -> Result<(), GeometryError> {
        self.ensure_mutable()?;
        validate(self.primitive, &arrays)?;
        self.arrays = arrays;
        self.invalidate();
        Ok(())
    }

    /// Replace every array at once
    pub fn replace_arrays(&mut self, arrays: GeometryArrays) -> Result<(), GeometryError> {
        self.swap_arrays(arrays)
    }

    /// Replace positions. The vertex count must not change unless nothing else depends on it.
    pub fn set_positions(&mut self, positions: PositionData) -> Result<(), GeometryError> {
        let arrays = GeometryArrays { positions, ..self.arrays.clone() };
        self.swap_arrays(arrays)
    }

    /// Replace or remove normals
    pub fn set_normals(&mut self, normals: Option<NormalData>) -> Result<(), GeometryError> {
        let arrays = GeometryArrays { normals, ..self.arrays.clone() };
        self.swap_arrays(arrays)
    }

    /// Replace or remove uvs
    pub fn set_uvs(&mut self, uvs: Option<UvData>) -> Result<(), GeometryError> {
        let arrays = GeometryArrays { uvs, ..self.arrays.clone() };
        self.swap_arrays(arrays)
    }

    /// Replace or remove indices
    pub fn set_indices(&mut self, indices: Option<Vec<u32>>) -> Result<(), GeometryError> {
        let arrays = GeometryArrays { indices, ..self.arrays.clone() };
        self.swap_arrays(arrays)
    }

    /// Decoded position of vertex `i`
    pub fn position(&self, i: usize) -> Option<Vec3> {
        match &self.arrays.positions {
            PositionData::Float(v) => v.get(i * 3..i * 3 + 3).map(|p| Vec3::new(p[0], p[1], p[2])),
            PositionData::Quantized { data, decode } => data
                .get(i * 3..i * 3 + 3)
                .map(|q| decode_position([q[0], q[1], q[2]], decode)),
        }
    }

    /// Decoded normal of vertex `i`
    pub fn normal(&self, i: usize) -> Option<Vec3> {
        match self.arrays.normals.as_ref()? {
            NormalData::Float(v) => v.get(i * 3..i * 3 + 3).map(|n| Vec3::new(n[0], n[1], n[2])),
            NormalData::Oct(v) => v.get(i * 2..i * 2 + 2).map(|n| oct_decode([n[0], n[1]])),
        }
    }

    /// Decoded uv of vertex `i`
    pub fn uv(&self, i: usize) -> Option<Vec2> {
        match self.arrays.uvs.as_ref()? {
            UvData::Float(v) => v.get(i * 2..i * 2 + 2).map(|t| Vec2::new(t[0], t[1])),
            UvData::Quantized { data, decode } => data
                .get(i * 2..i * 2 + 2)
                .map(|q| decode_uv([q[0], q[1]], decode)),
        }
    }

    fn element_count(&self) -> usize {
        self.arrays.indices.as_ref().map_or(self.vertex_count(), Vec::len)
    }

    fn element(&self, k: usize) -> u32 {
        match &self.arrays.indices {
            Some(indices) => indices[k],
            None => k as u32,
        }
    }

    /// Number of triangles the primitive assembles into (zero for points and lines)
    pub fn triangle_count(&self) -> usize {
        let n = self.element_count();
        match self.primitive {
            PrimitiveKind::Triangles => n / 3,
            PrimitiveKind::TriangleStrip | PrimitiveKind::TriangleFan => n.saturating_sub(2),
            _ => 0,
        }
    }

    /// Vertex indices of triangle `t`
    pub fn triangle(&self, t: usize) -> Option<[u32; 3]> {
        if t >= self.triangle_count() {
            return None;
        }
        let tri = match self.primitive {
            PrimitiveKind::Triangles => [self.element(3 * t), self.element(3 * t + 1), self.element(3 * t + 2)],
            PrimitiveKind::TriangleStrip if t % 2 == 0 => [self.element(t), self.element(t + 1), self.element(t + 2)],
            PrimitiveKind::TriangleStrip => [self.element(t + 1), self.element(t), self.element(t + 2)],
            PrimitiveKind::TriangleFan => [self.element(0), self.element(t + 1), self.element(t + 2)],
            _ => return None,
        };
        Some(tri)
    }

    /// Decoded positions of triangle `t`
    pub fn triangle_vertices(&self, t: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = self.triangle(t)?;
        Some([
            self.position(a as usize)?,
            self.position(b as usize)?,
            self.position(c as usize)?,
        ])
    }

    /// Model-space bounds of all vertices, computed once per array change
    pub fn local_aabb(&mut self) -> AABB {
        if let Some(aabb) = self.local_aabb {
            return aabb;
        }
        let aabb = (0..self.vertex_count())
            .filter_map(|i| self.position(i))
            .fold(AABB::empty(), |mut acc, p| {
                acc.expand(p);
                acc
            });
        self.local_aabb = Some(aabb);
        aabb
    }

    /// Dequantized triangle soup, three positions per triangle
    pub fn pick_triangle_positions(&mut self) -> &[Vec3] {
        if self.pick_positions.is_none() {
            let soup = (0..self.triangle_count())
                .filter_map(|t| self.triangle_vertices(t))
                .flatten()
                .collect();
            self.pick_positions = Some(soup);
        }
        self.pick_positions.as_deref().unwrap_or_default()
    }

    /// Per-vertex tangents (`xyz` plus handedness in `w`).
    ///
    /// `None` unless the buffer has triangles, normals and uvs.
    pub fn tangents(&mut self) -> Option<&[Vec4]> {
        if self.tangents.is_none() {
            self.tangents = Some(self.compute_tangents()?);
        }
        self.tangents.as_deref()
    }

    fn compute_tangents(&self) -> Option<Vec<Vec4>> {
        if !self.primitive.is_triangles() || self.arrays.normals.is_none() || self.arrays.uvs.is_none() {
            return None;
        }
        let n = self.vertex_count();
        let mut tan = vec![Vec3::zeros(); n];
        let mut bitan = vec![Vec3::zeros(); n];

        for t in 0..self.triangle_count() {
            let Some(idx) = self.triangle(t) else { continue };
            let [i0, i1, i2] = idx.map(|i| i as usize);
            let (Some(p0), Some(p1), Some(p2)) = (self.position(i0), self.position(i1), self.position(i2)) else {
                continue;
            };
            let (Some(w0), Some(w1), Some(w2)) = (self.uv(i0), self.uv(i1), self.uv(i2)) else {
                continue;
            };
            let e1 = p1 - p0;
            let e2 = p2 - p0;
            let d1 = w1 - w0;
            let d2 = w2 - w0;
            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let sdir = (e1 * d2.y - e2 * d1.y) * r;
            let tdir = (e2 * d1.x - e1 * d2.x) * r;
            for i in [i0, i1, i2] {
                tan[i] += sdir;
                bitan[i] += tdir;
            }
        }

        let tangents = (0..n)
            .map(|i| {
                let normal = self.normal(i).unwrap_or_else(Vec3::z);
                // Gram-Schmidt against the normal
                let t = tan[i] - normal * normal.dot(&tan[i]);
                let t = if t.norm() > f32::EPSILON { t.normalize() } else { Vec3::x() };
                let w = if normal.cross(&t).dot(&bitan[i]) < 0.0 { -1.0 } else { 1.0 };
                Vec4::new(t.x, t.y, t.z, w)
            })
            .collect();
        Some(tangents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quantization::quantize_positions;
    use approx::assert_relative_eq;

    fn quad() -> GeometryArrays {
        GeometryArrays::from_positions(vec![
            0.0, 0.0, 0.0,
            1.0, 0.0, 0.0,
            1.0, 1.0, 0.0,
            0.0, 1.0, 0.0,
        ])
        .with_indices(vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_build_rejects_out_of_range_index() {
        let arrays = quad().with_indices(vec![0, 1, 4]);
        let err = GeometryBuffer::build(PrimitiveKind::Triangles, arrays, false).unwrap_err();
        assert_eq!(err, GeometryError::IndexOutOfRange { index: 4, vertex_count: 4 });
    }

    #[test]
    fn test_build_rejects_mismatched_normals() {
        let arrays = quad().with_normals(NormalData::Float(vec![0.0, 0.0, 1.0]));
        let err = GeometryBuffer::build(PrimitiveKind::Triangles, arrays, false).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidLength { array: "normals", .. }));
    }

    #[test]
    fn test_implicit_triangle_list_without_indices() {
        let arrays = GeometryArrays::from_positions(vec![0.0; 18]);
        let buffer = GeometryBuffer::build(PrimitiveKind::Triangles, arrays, false).unwrap();
        assert_eq!(buffer.triangle_count(), 2);
        assert_eq!(buffer.triangle(1), Some([3, 4, 5]));
        assert_eq!(buffer.triangle(2), None);
    }

    #[test]
    fn test_strip_and_fan_resolution() {
        let strip = GeometryBuffer::build(PrimitiveKind::TriangleStrip, quad().with_indices(vec![0, 1, 3, 2]), false).unwrap();
        assert_eq!(strip.triangle_count(), 2);
        assert_eq!(strip.triangle(0), Some([0, 1, 3]));
        assert_eq!(strip.triangle(1), Some([3, 1, 2]));

        let fan = GeometryBuffer::build(PrimitiveKind::TriangleFan, quad().with_indices(vec![0, 1, 2, 3]), false).unwrap();
        assert_eq!(fan.triangle(1), Some([0, 2, 3]));

        let lines = GeometryBuffer::build(PrimitiveKind::Lines, quad(), false).unwrap();
        assert_eq!(lines.triangle_count(), 0);
    }

    #[test]
    fn test_combined_buffer_is_immutable() {
        let mut buffer = GeometryBuffer::build(PrimitiveKind::Triangles, quad(), true).unwrap();
        assert_eq!(buffer.set_indices(None), Err(GeometryError::Immutable));
        assert_eq!(buffer.replace_arrays(quad()), Err(GeometryError::Immutable));
    }

    #[test]
    fn test_array_swap_invalidates_local_aabb() {
        let mut buffer = GeometryBuffer::build(PrimitiveKind::Triangles, quad(), false).unwrap();
        assert_relative_eq!(buffer.local_aabb().max, Vec3::new(1.0, 1.0, 0.0));

        buffer
            .set_positions(PositionData::Float(vec![
                0.0, 0.0, 0.0,
                2.0, 0.0, 0.0,
                2.0, 3.0, 0.0,
                0.0, 3.0, 1.0,
            ]))
            .unwrap();
        assert_relative_eq!(buffer.local_aabb().max, Vec3::new(2.0, 3.0, 1.0));
        assert_eq!(buffer.pick_triangle_positions().len(), 6);
    }

    #[test]
    fn test_quantized_positions_are_dequantized_for_picking() {
        let (data, decode) = quantize_positions(&[0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let arrays = GeometryArrays {
            positions: PositionData::Quantized { data, decode },
            normals: None,
            uvs: None,
            indices: None,
        };
        let mut buffer = GeometryBuffer::build(PrimitiveKind::Triangles, arrays, true).unwrap();
        let soup = buffer.pick_triangle_positions();
        assert_eq!(soup.len(), 3);
        assert_relative_eq!(soup[1], Vec3::new(4.0, 0.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn test_tangents_follow_u_direction() {
        let arrays = quad()
            .with_normals(NormalData::Float([0.0, 0.0, 1.0].repeat(4)))
            .with_uvs(UvData::Float(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]));
        let mut buffer = GeometryBuffer::build(PrimitiveKind::Triangles, arrays, false).unwrap();
        let tangents = buffer.tangents().expect("has normals and uvs");
        assert_eq!(tangents.len(), 4);
        assert_relative_eq!(tangents[0], Vec4::new(1.0, 0.0, 0.0, 1.0), epsilon = 1e-5);

        let mut bare = GeometryBuffer::build(PrimitiveKind::Triangles, quad(), false).unwrap();
        assert!(bare.tangents().is_none());
    }
}
