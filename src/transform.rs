//! Transform component for scene objects.
//!
//! Provides a [`Transform`] struct with a fluent API for managing position,
//! rotation (Euler angles), and scale, plus a cached model matrix guarded by
//! an explicit [`TransformState`].

use std::f32::consts::{PI, TAU};

use crate::math::{mat3::Mat3, mat4::Mat4, vec3::Vec3};

/// Whether the cached model matrix reflects the current components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformState {
    Clean,
    Dirty,
}

/// A 3D transform with position, rotation (Euler angles), and scale.
///
/// Every mutator marks the transform [`TransformState::Dirty`]; the model
/// matrix is only rebuilt by [`Transform::update_model_matrix`].
///
/// ```ignore
/// transform
///     .set_position_xyz(5.0, 2.0, 0.0)
///     .rotate_y(0.1)
///     .set_scale_uniform(2.0);
/// transform.update_model_matrix();
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3, // Euler angles in radians: x=pitch, y=yaw, z=roll, wrapped to (-PI, PI]
    scale: Vec3,
    model: Mat4,
    state: TransformState,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            model: Mat4::identity(),
            state: TransformState::Dirty,
        }
    }
}

/// Wraps an angle into (-PI, PI].
fn wrap_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

fn wrap_angles(v: Vec3) -> Vec3 {
    Vec3::new(wrap_angle(v.x), wrap_angle(v.y), wrap_angle(v.z))
}

impl Transform {
    /// Create a new transform with default values (position=0, rotation=0, scale=1).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransformState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == TransformState::Dirty
    }

    pub fn mark_dirty(&mut self) {
        self.state = TransformState::Dirty;
    }

    // ============ Position ============

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.position = position;
        self.mark_dirty();
        self
    }

    pub fn set_position_xyz(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.set_position(Vec3::new(x, y, z))
    }

    /// Translate by a delta vector.
    pub fn translate(&mut self, delta: Vec3) -> &mut Self {
        self.set_position(self.position + delta)
    }

    // ============ Rotation ============

    /// Get the rotation (Euler angles in radians).
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Set the rotation (Euler angles in radians, wrapped into (-PI, PI]).
    pub fn set_rotation(&mut self, rotation: Vec3) -> &mut Self {
        self.rotation = wrap_angles(rotation);
        self.mark_dirty();
        self
    }

    pub fn set_rotation_xyz(&mut self, pitch: f32, yaw: f32, roll: f32) -> &mut Self {
        self.set_rotation(Vec3::new(pitch, yaw, roll))
    }

    /// Add a delta rotation (Euler angles in radians).
    pub fn rotate(&mut self, delta: Vec3) -> &mut Self {
        self.set_rotation(self.rotation + delta)
    }

    /// Rotate around the X axis (pitch).
    pub fn rotate_x(&mut self, angle: f32) -> &mut Self {
        self.rotate(Vec3::new(angle, 0.0, 0.0))
    }

    /// Rotate around the Y axis (yaw).
    pub fn rotate_y(&mut self, angle: f32) -> &mut Self {
        self.rotate(Vec3::new(0.0, angle, 0.0))
    }

    /// Rotate around the Z axis (roll).
    pub fn rotate_z(&mut self, angle: f32) -> &mut Self {
        self.rotate(Vec3::new(0.0, 0.0, angle))
    }

    /// Orients the transform so its forward axis points at `target`.
    /// Roll is reset. A target at the current position is ignored.
    pub fn look_at(&mut self, target: Vec3) -> &mut Self {
        self.look_along(target - self.position)
    }

    /// Orients the forward axis along `direction`.
    pub fn look_along(&mut self, direction: Vec3) -> &mut Self {
        if direction.length_squared() <= f32::EPSILON {
            return self;
        }
        let d = direction.normalize();
        let pitch = d.y.clamp(-1.0, 1.0).asin();
        let yaw = (-d.x).atan2(-d.z);
        self.set_rotation(Vec3::new(pitch, yaw, 0.0))
    }

    // ============ Scale ============

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.scale = scale;
        self.mark_dirty();
        self
    }

    /// Set uniform scale (same value for x, y, z).
    pub fn set_scale_uniform(&mut self, s: f32) -> &mut Self {
        self.set_scale(Vec3::new(s, s, s))
    }

    /// Multiply the current scale by a factor vector.
    pub fn scale_by(&mut self, factor: Vec3) -> &mut Self {
        self.set_scale(self.scale.mul_elem(factor))
    }

    // ============ Directions ============

    /// Rotation only: yaw, then pitch, then roll (`Ry * Rx * Rz`).
    pub fn rotation_matrix(&self) -> Mat4 {
        Mat4::rotation_yxz(self.rotation)
    }

    /// Direction of local -Z in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation_matrix().transform_vector(Vec3::FORWARD).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.rotation_matrix().transform_vector(Vec3::RIGHT).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.rotation_matrix().transform_vector(Vec3::UP).normalize()
    }

    // ============ Matrix Generation ============

    /// Build the model matrix from the current components.
    ///
    /// Order: Translation * Rotation * Scale
    /// (scale applied first, then rotation, then translation)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::translation(self.position.x, self.position.y, self.position.z)
            * self.rotation_matrix()
            * Mat4::scaling(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Recomputes the cached model matrix if dirty and marks the transform
    /// clean. Returns whether anything was recomputed.
    pub fn update_model_matrix(&mut self) -> bool {
        if self.state == TransformState::Clean {
            return false;
        }
        self.model = self.to_matrix();
        self.state = TransformState::Clean;
        true
    }

    /// The cached model matrix as of the last [`Transform::update_model_matrix`].
    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// Inverse transpose of the cached model matrix's rotation and scale.
    pub fn normal_matrix(&self) -> Mat3 {
        self.model.to_mat3().normal_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default() {
        let t = Transform::default();
        assert_eq!(t.position(), Vec3::ZERO);
        assert_eq!(t.rotation(), Vec3::ZERO);
        assert_eq!(t.scale(), Vec3::ONE);
        assert!(t.is_dirty());
    }

    #[test]
    fn test_fluent_api() {
        let mut t = Transform::new();
        t.set_position_xyz(1.0, 2.0, 3.0)
            .rotate_y(0.5)
            .set_scale_uniform(2.0);

        assert_eq!(t.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(t.rotation().y, 0.5);
        assert_eq!(t.scale(), Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn update_is_idempotent() {
        let mut t = Transform::new();
        t.set_position_xyz(1.0, -2.0, 0.5).rotate_x(0.3).set_scale_uniform(3.0);

        assert!(t.update_model_matrix());
        let first = t.model_matrix();
        assert_eq!(t.state(), TransformState::Clean);

        assert!(!t.update_model_matrix());
        assert_eq!(t.model_matrix(), first);
    }

    #[test]
    fn mutation_marks_dirty() {
        let mut t = Transform::new();
        t.update_model_matrix();
        t.translate(Vec3::UP);
        assert!(t.is_dirty());
    }

    #[test]
    fn model_matrix_scales_then_rotates_then_translates() {
        let mut t = Transform::new();
        t.set_position_xyz(10.0, 0.0, 0.0)
            .rotate_y(std::f32::consts::FRAC_PI_2)
            .set_scale_uniform(2.0);
        t.update_model_matrix();

        // (0,0,-1) scaled to (0,0,-2), yawed left to (-2,0,0), then moved.
        let p = t.model_matrix().transform_point(Vec3::FORWARD);
        assert_relative_eq!(p.x, 8.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn rotation_wraps() {
        let mut t = Transform::new();
        t.rotate_y(3.0 * PI / 2.0);
        assert_relative_eq!(t.rotation().y, -PI / 2.0, epsilon = 1e-5);
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut t = Transform::new();
        t.set_position_xyz(3.0, 4.0, 5.0).look_at(Vec3::new(-1.0, 0.0, 2.0));
        let expected = (Vec3::new(-1.0, 0.0, 2.0) - t.position()).normalize();
        let forward = t.forward();
        assert_relative_eq!(forward.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(forward.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(forward.z, expected.z, epsilon = 1e-5);
    }
}
