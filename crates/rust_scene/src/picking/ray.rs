//! Rays and triangle intersection

use crate::foundation::math::{transform_point, transform_vector, Mat4, Vec3};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and normalized direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at parameter t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Carry the ray through a matrix without renormalizing, so ray
    /// parameters stay comparable across spaces
    pub fn transformed(&self, matrix: &Mat4) -> Ray {
        Ray {
            origin: transform_point(matrix, &self.origin),
            direction: transform_vector(matrix, &self.direction),
        }
    }
}

/// A triangle for intersection tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized face normal (right-hand rule)
    pub fn face_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) if hit, None otherwise
    ///
    /// Both faces are hit. See: "Fast, Minimum Storage Ray/Triangle
    /// Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        const EPSILON: f32 = 0.000001;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle?
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None // Behind ray origin
        }
    }

    /// Barycentric weights `(w0, w1, w2)` of a point in the triangle's plane.
    ///
    /// Returns `None` for degenerate triangles.
    pub fn barycentric(&self, point: &Vec3) -> Option<Vec3> {
        let e0 = self.v1 - self.v0;
        let e1 = self.v2 - self.v0;
        let ep = point - self.v0;
        let d00 = e0.dot(&e0);
        let d01 = e0.dot(&e1);
        let d11 = e1.dot(&e1);
        let d20 = ep.dot(&e0);
        let d21 = ep.dot(&e1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let w1 = (d11 * d20 - d01 * d21) / denom;
        let w2 = (d00 * d21 - d01 * d20) / denom;
        Some(Vec3::new(1.0 - w1 - w2, w1, w2))
    }

    /// Parameter at which the ray meets the triangle's plane
    pub fn intersect_plane(&self, ray: &Ray) -> Option<f32> {
        let n = self.face_normal();
        let denom = n.dot(&ray.direction);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        Some(n.dot(&(self.v0 - ray.origin)) / denom)
    }
}
