//! Compressed vertex attribute encodings
//!
//! Positions and uvs are stored as `u16` with a decode matrix mapping the
//! integer lattice back to model space. Normals are stored as two `i8`
//! octahedral coordinates.

use crate::foundation::math::{utils::sign_not_zero, Mat3, Mat4, Vec2, Vec3};

const U16_MAX: f32 = 65535.0;
const I8_MAX: f32 = 127.0;

fn axis_ranges<const N: usize>(values: &[f32]) -> ([f32; N], [f32; N]) {
    let mut min = [f32::INFINITY; N];
    let mut max = [f32::NEG_INFINITY; N];
    for chunk in values.chunks_exact(N) {
        for axis in 0..N {
            min[axis] = min[axis].min(chunk[axis]);
            max[axis] = max[axis].max(chunk[axis]);
        }
    }
    for axis in 0..N {
        if min[axis] > max[axis] {
            min[axis] = 0.0;
            max[axis] = 0.0;
        }
    }
    (min, max)
}

fn step(min: f32, max: f32) -> f32 {
    let range = max - min;
    if range > 0.0 { range / U16_MAX } else { 1.0 }
}

fn quantize(value: f32, min: f32, step: f32) -> u16 {
    ((value - min) / step).round().clamp(0.0, U16_MAX) as u16
}

/// Quantize flat `xyz` positions to `u16`, returning the data and its decode matrix
pub fn quantize_positions(positions: &[f32]) -> (Vec<u16>, Mat4) {
    let (min, max) = axis_ranges::<3>(positions);
    let steps = [step(min[0], max[0]), step(min[1], max[1]), step(min[2], max[2])];

    let data = positions
        .chunks_exact(3)
        .flat_map(|p| (0..3).map(move |axis| quantize(p[axis], min[axis], steps[axis])))
        .collect();

    let decode = Mat4::new_translation(&Vec3::new(min[0], min[1], min[2]))
        * Mat4::new_nonuniform_scaling(&Vec3::new(steps[0], steps[1], steps[2]));
    (data, decode)
}

/// Decode one quantized position
pub fn decode_position(quantized: [u16; 3], decode: &Mat4) -> Vec3 {
    let q = Vec3::new(f32::from(quantized[0]), f32::from(quantized[1]), f32::from(quantized[2]));
    crate::foundation::math::transform_point(decode, &q)
}

/// Quantize flat `uv` pairs to `u16`, returning the data and its decode matrix
pub fn quantize_uvs(uvs: &[f32]) -> (Vec<u16>, Mat3) {
    let (min, max) = axis_ranges::<2>(uvs);
    let steps = [step(min[0], max[0]), step(min[1], max[1])];

    let data = uvs
        .chunks_exact(2)
        .flat_map(|p| (0..2).map(move |axis| quantize(p[axis], min[axis], steps[axis])))
        .collect();

    let decode = Mat3::new(
        steps[0], 0.0, min[0],
        0.0, steps[1], min[1],
        0.0, 0.0, 1.0,
    );
    (data, decode)
}

/// Decode one quantized uv
pub fn decode_uv(quantized: [u16; 2], decode: &Mat3) -> Vec2 {
    let h = decode * Vec3::new(f32::from(quantized[0]), f32::from(quantized[1]), 1.0);
    Vec2::new(h.x, h.y)
}

/// Encode a unit normal as two octahedral `i8` coordinates
pub fn oct_encode(normal: &Vec3) -> [i8; 2] {
    let l1 = normal.x.abs() + normal.y.abs() + normal.z.abs();
    if l1 == 0.0 {
        return [0, 0];
    }
    let mut x = normal.x / l1;
    let mut y = normal.y / l1;
    if normal.z < 0.0 {
        let (ox, oy) = (x, y);
        x = (1.0 - oy.abs()) * sign_not_zero(ox);
        y = (1.0 - ox.abs()) * sign_not_zero(oy);
    }
    let to_i8 = |v: f32| (v.clamp(-1.0, 1.0) * I8_MAX).round() as i8;
    [to_i8(x), to_i8(y)]
}

/// Decode two octahedral `i8` coordinates into a unit normal
pub fn oct_decode(encoded: [i8; 2]) -> Vec3 {
    let mut x = f32::from(encoded[0]) / I8_MAX;
    let mut y = f32::from(encoded[1]) / I8_MAX;
    let z = 1.0 - x.abs() - y.abs();
    if z < 0.0 {
        let (ox, oy) = (x, y);
        x = (1.0 - oy.abs()) * sign_not_zero(ox);
        y = (1.0 - ox.abs()) * sign_not_zero(oy);
    }
    let v = Vec3::new(x, y, z);
    let len = v.norm();
    if len > 0.0 { v / len } else { Vec3::z() }
}
