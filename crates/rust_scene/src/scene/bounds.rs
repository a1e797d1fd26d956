//! Bounding volumes
//!
//! Axis-aligned boxes for the hierarchy and broad phase, and oriented boxes
//! stored as their eight transformed corners.

use crate::foundation::math::{transform_point, Mat4, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
///
/// An empty box has `min > max` on every axis and absorbs nothing in unions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::empty()
    }
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The empty box
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Whether the box contains no points
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand(*p);
        }
        aabb
    }

    /// Grow to include a point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// The eight corners, indexed by bit pattern `zyx` (bit set = max on that axis)
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Axis-aligned hull of this box after transformation
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        if self.is_empty() {
            return *self;
        }
        let corners = self.corners().map(|c| transform_point(matrix, &c));
        AABB::from_points(&corners)
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    /// Based on "An Efficient and Robust Ray–Box Intersection Algorithm"
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            if ray_dir[axis] == 0.0 {
                // Parallel to this slab: inside or never
                if ray_origin[axis] < self.min[axis] || ray_origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - ray_origin[axis]) * inv_dir[axis];
            let t2 = (self.max[axis] - ray_origin[axis]) * inv_dir[axis];
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            // Entry distance, or 0 when the origin is inside the box
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Oriented bounding box as eight world-space corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OBB {
    /// Corners in the same order as [`AABB::corners`]
    pub corners: [Vec3; 8],
}

impl Default for OBB {
    fn default() -> Self {
        Self {
            corners: [Vec3::zeros(); 8],
        }
    }
}

impl OBB {
    /// Corners of an axis-aligned box. An empty box yields the degenerate zero OBB.
    pub fn from_aabb(aabb: &AABB) -> Self {
        if aabb.is_empty() {
            return Self::default();
        }
        Self {
            corners: aabb.corners(),
        }
    }

    /// Corners of `local` carried through `matrix`
    pub fn from_local_aabb(local: &AABB, matrix: &Mat4) -> Self {
        if local.is_empty() {
            return Self::default();
        }
        Self {
            corners: local.corners().map(|c| transform_point(matrix, &c)),
        }
    }

    /// Axis-aligned hull of the corners
    pub fn aabb(&self) -> AABB {
        AABB::from_points(&self.corners)
    }

    /// Mean of the corners
    pub fn center(&self) -> Vec3 {
        self.corners.iter().sum::<Vec3>() / 8.0
    }
}
