//! # Camera and canvas
//!
//! Just enough camera to turn a canvas coordinate into a world-space ray.
//!
//! ## Conventions
//! - Right-handed, Y-up world space
//! - Canvas origin at the top-left corner, Y growing downwards
//! - Clip space depth in `[-1, 1]`

use crate::foundation::math::{transform_point, utils, Mat4, Mat4Ext, Vec2, Vec3, Vec4};

use super::ray::Ray;

/// Canvas size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, or 1 when degenerate
    pub fn aspect(&self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Canvas pixel to normalized device coordinates
    pub fn canvas_to_ndc(&self, canvas: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * canvas.x / self.width as f32 - 1.0,
            1.0 - 2.0 * canvas.y / self.height as f32,
        )
    }
}

/// Perspective camera for picking
///
/// Matrices are computed on demand; the aspect ratio comes from the
/// [`Viewport`] at pick time.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub eye: Vec3,
    /// Point the camera is looking at
    pub look: Vec3,
    /// Up vector (typically +Y)
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Distance to the near clipping plane
    pub near: f32,
    /// Distance to the far clipping plane
    pub far: f32,
}

impl Default for Camera {
    /// Camera on +Z looking at the origin with a 60 degree field of view
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            look: Vec3::zeros(),
            up: Vec3::y(),
            fov_y: utils::deg_to_rad(60.0),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Perspective camera at `eye` looking at the origin
    ///
    /// # Arguments
    /// * `eye` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `near` - Near plane distance (must be > 0)
    /// * `far` - Far plane distance (must be > near)
    pub fn perspective(eye: Vec3, fov_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            eye,
            fov_y: utils::deg_to_rad(fov_degrees),
            near,
            far,
            ..Self::default()
        }
    }

    /// Builder: point the camera
    pub fn look_at(mut self, eye: Vec3, look: Vec3, up: Vec3) -> Self {
        self.eye = eye;
        self.look = look;
        self.up = up;
        self
    }

    /// World to view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.look, self.up)
    }

    /// View to clip transform for the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective(self.fov_y, aspect, self.near, self.far)
    }

    /// Cast a ray through a canvas pixel.
    ///
    /// Unprojects the pixel at the near and far planes through the inverse
    /// view-projection. Returns `None` for a zero-extent canvas or a singular
    /// camera.
    pub fn canvas_to_ray(&self, canvas: Vec2, viewport: Viewport) -> Option<Ray> {
        if viewport.is_degenerate() {
            return None;
        }
        let view_proj = self.projection_matrix(viewport.aspect()) * self.view_matrix();
        let inverse = view_proj.try_inverse().filter(|m| m.iter().all(|v| v.is_finite()))?;
        let ndc = viewport.canvas_to_ndc(canvas);

        let unproject = |z: f32| {
            let h = inverse * Vec4::new(ndc.x, ndc.y, z, 1.0);
            (h.w.abs() > f32::EPSILON).then(|| h.xyz() / h.w)
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;
        let direction = far - near;
        if direction.norm() <= f32::EPSILON {
            return None;
        }
        Some(Ray::new(near, direction))
    }

    /// World position to view space
    pub fn to_view(&self, world: &Vec3) -> Vec3 {
        transform_point(&self.view_matrix(), world)
    }
}
