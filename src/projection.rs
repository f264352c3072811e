//! Perspective projection parameters.
//!
//! The [`Projection`] struct describes the lens as a focal length over a
//! fixed-height sensor, the way physical cameras are specified. The vertical
//! field of view is derived from it.

use crate::math::mat4::Mat4;

/// Sensor height in millimetres (a 36x24 full-frame sensor).
pub const SENSOR_HEIGHT_MM: f32 = 24.0;

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Focal length in millimetres.
    focal_length: f32,
    sensor_height: f32,
    /// Aspect ratio (width / height).
    aspect_ratio: f32,
    near: f32,
    far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(28.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Projection {
    /// Creates a new projection.
    ///
    /// # Arguments
    /// * `focal_length` - Lens focal length in millimetres
    /// * `aspect_ratio` - Width divided by height
    /// * `near` - Near clipping plane distance (must be > 0)
    /// * `far` - Far clipping plane distance (must be > near)
    pub fn new(focal_length: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            focal_length,
            sensor_height: SENSOR_HEIGHT_MM,
            aspect_ratio,
            near,
            far,
        }
    }

    /// Creates a projection from a vertical field of view in radians.
    pub fn from_fov(fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        let focal_length = SENSOR_HEIGHT_MM / (2.0 * (fov_y / 2.0).tan());
        Self::new(focal_length, aspect_ratio, near, far)
    }

    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    pub fn sensor_height(&self) -> f32 {
        self.sensor_height
    }

    /// Vertical field of view in radians: `2·atan(sensor / (2·focal))`.
    pub fn fov_y(&self) -> f32 {
        2.0 * (self.sensor_height / (2.0 * self.focal_length)).atan()
    }

    /// Horizontal field of view in radians.
    pub fn fov_x(&self) -> f32 {
        2.0 * (self.aspect_ratio * (self.fov_y() / 2.0).tan()).atan()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_focal_length(&mut self, focal_length: f32) {
        self.focal_length = focal_length;
    }

    /// Updates the aspect ratio (typically called on resize).
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// Right-handed perspective matrix with depth in [-1, 1].
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y(), self.aspect_ratio, self.near, self.far)
    }
}
