//! Perspective camera with frustum culling.
//!
//! # Coordinate System
//!
//! Right-handed, Y up. An unrotated camera looks down -Z.
//!
//! The camera's [`Transform`] places it in the world; the view matrix is its
//! inverse. Frustum planes are extracted from `projection * view` and cached
//! until a view or lens change marks them dirty.

use crate::math::bounds::BoundingBox;
use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;
use crate::projection::Projection;
use crate::transform::Transform;

/// Index of each frustum plane in [`Camera::frustum_planes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    Left = 0,
    Right = 1,
    Bottom = 2,
    Top = 3,
    Near = 4,
    Far = 5,
}

#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    projection: Projection,
    view: Mat4,
    proj: Mat4,
    /// Planes as `(a, b, c, d)` with `a·x + b·y + c·z + d >= 0` inside.
    planes: [Vec4; 6],
    frustum_dirty: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Projection::default())
    }
}

impl Camera {
    pub fn new(projection: Projection) -> Self {
        let mut camera = Self {
            transform: Transform::new(),
            projection,
            view: Mat4::identity(),
            proj: projection.matrix(),
            planes: [Vec4::ZERO; 6],
            frustum_dirty: true,
        };
        camera.update();
        camera
    }

    /// Creates a camera at `position` looking toward `target`.
    pub fn looking_at(projection: Projection, position: Vec3, target: Vec3) -> Self {
        let mut camera = Self::new(projection);
        camera.transform_mut().set_position(position).look_at(target);
        camera.update();
        camera
    }

    // =========================================================================
    // Placement
    // =========================================================================

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable access to the placement. Marks the frustum dirty.
    pub fn transform_mut(&mut self) -> &mut Transform {
        self.frustum_dirty = true;
        &mut self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.transform_mut().look_at(target);
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn right(&self) -> Vec3 {
        self.transform.right()
    }

    pub fn up(&self) -> Vec3 {
        self.transform.up()
    }

    // =========================================================================
    // Lens
    // =========================================================================

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.projection.set_aspect_ratio(aspect_ratio);
        self.frustum_dirty = true;
    }

    pub fn set_focal_length(&mut self, focal_length: f32) {
        self.projection.set_focal_length(focal_length);
        self.frustum_dirty = true;
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.projection.set_clip_planes(near, far);
        self.frustum_dirty = true;
    }

    // =========================================================================
    // Matrices
    // =========================================================================

    /// Updates the transform, caches the view and projection matrices and
    /// refreshes the frustum planes when needed.
    pub fn update(&mut self) {
        if self.transform.update_model_matrix() {
            self.frustum_dirty = true;
        }
        self.update_frustum_planes();
    }

    /// Inverse of the camera's model matrix. Marks the frustum dirty.
    pub fn view_matrix(&mut self) -> Mat4 {
        self.transform.update_model_matrix();
        self.frustum_dirty = true;
        self.compute_view_matrix()
    }

    fn compute_view_matrix(&self) -> Mat4 {
        self.transform.model_matrix().inverse_or_identity()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// View matrix as of the last [`Camera::update`].
    pub fn cached_view(&self) -> Mat4 {
        self.view
    }

    /// Projection matrix as of the last [`Camera::update`].
    pub fn cached_projection(&self) -> Mat4 {
        self.proj
    }

    pub fn view_projection(&self) -> Mat4 {
        self.proj * self.view
    }

    // =========================================================================
    // Frustum
    // =========================================================================

    pub fn is_frustum_dirty(&self) -> bool {
        self.frustum_dirty
    }

    /// Extracts the six planes from `projection * view`. No-op when clean.
    pub fn update_frustum_planes(&mut self) {
        if !self.frustum_dirty {
            return;
        }
        self.view = self.compute_view_matrix();
        self.proj = self.projection.matrix();

        let m = self.proj * self.view;
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));

        self.planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r3 + r2, // near
            r3 - r2, // far
        ]
        .map(normalize_plane);

        self.frustum_dirty = false;
    }

    pub fn frustum_planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    pub fn frustum_plane(&self, plane: FrustumPlane) -> Vec4 {
        self.planes[plane as usize]
    }

    /// Conservative box test: `false` only when the box lies entirely on the
    /// outside of some plane. Uses the planes as of the last update.
    pub fn is_visible(&self, bbox: &BoundingBox) -> bool {
        let center = bbox.center();
        let extents = bbox.half_extents();

        self.planes.iter().all(|plane| {
            let normal = plane.xyz();
            let distance = normal.dot(center) + plane.w;
            let radius = extents.dot(normal.abs());
            distance >= -radius
        })
    }
}

/// Scales a plane so its normal has unit length. Degenerate planes are kept.
fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.xyz_length();
    if length > 0.0 {
        plane * (1.0 / length)
    } else {
        plane
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_camera() -> Camera {
        Camera::looking_at(
            Projection::from_fov(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
        )
    }

    fn unit_box_at(center: Vec3) -> BoundingBox {
        BoundingBox::new(center - Vec3::ONE * 0.5, center + Vec3::ONE * 0.5)
    }

    #[test]
    fn camera_starts_looking_down_negative_z() {
        let camera = Camera::default();
        assert_relative_eq!(camera.forward().z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.forward().x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn view_matrix_places_target_in_front() {
        let mut camera = test_camera();
        let view = camera.view_matrix();
        let origin = view.transform_point(Vec3::ZERO);
        assert_relative_eq!(origin.z, -10.0, epsilon = 1e-4);
        assert!(camera.is_frustum_dirty());
    }

    #[test]
    fn planes_are_normalized() {
        let camera = test_camera();
        for plane in camera.frustum_planes() {
            assert_relative_eq!(plane.xyz_length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn box_in_front_is_visible() {
        let camera = test_camera();
        assert!(camera.is_visible(&unit_box_at(Vec3::ZERO)));
    }

    #[test]
    fn box_behind_camera_is_culled() {
        let camera = test_camera();
        assert!(!camera.is_visible(&unit_box_at(Vec3::new(0.0, 0.0, 20.0))));
    }

    #[test]
    fn box_beyond_far_plane_is_culled() {
        let camera = test_camera();
        assert!(!camera.is_visible(&unit_box_at(Vec3::new(0.0, 0.0, -200.0))));
    }

    #[test]
    fn box_straddling_side_plane_is_kept() {
        let camera = test_camera();
        // 90 degree fov at distance 10: the left plane passes x = -10.
        assert!(camera.is_visible(&unit_box_at(Vec3::new(-10.2, 0.0, 0.0))));
        assert!(!camera.is_visible(&unit_box_at(Vec3::new(-12.0, 0.0, 0.0))));
    }

    #[test]
    fn visible_points_lie_inside_all_planes() {
        // Any point that projects inside the NDC cube must pass every plane.
        let camera = test_camera();
        let vp = camera.view_projection();
        for &p in &[
            Vec3::new(1.0, 2.0, -3.0),
            Vec3::new(-8.0, 7.5, 0.0),
            Vec3::new(0.0, 0.0, -80.0),
        ] {
            let clip = vp * Vec4::point(p);
            let ndc = clip.perspective_divide();
            assert!(clip.w > 0.0 && ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
            for plane in camera.frustum_planes() {
                assert!(plane.xyz().dot(p) + plane.w >= -1e-4);
            }
        }
    }

    #[test]
    fn box_at_near_plane_center_is_visible() {
        let projection = Projection::from_fov(1.2, 1.5, 0.1, 100.0);
        let camera = Camera::looking_at(projection, Vec3::new(2.0, 3.0, 4.0), Vec3::ZERO);
        let center = camera.position() + camera.forward() * projection.near();
        let tiny = BoundingBox::new(center - Vec3::ONE * 1e-3, center + Vec3::ONE * 1e-3);
        assert!(camera.is_visible(&tiny));

        // A box of the same size just behind the camera is culled.
        let behind = camera.position() - camera.forward() * 0.5;
        let tiny = BoundingBox::new(behind - Vec3::ONE * 1e-3, behind + Vec3::ONE * 1e-3);
        assert!(!camera.is_visible(&tiny));
    }

    #[test]
    fn lens_change_dirties_frustum() {
        let mut camera = test_camera();
        assert!(!camera.is_frustum_dirty());
        camera.set_focal_length(50.0);
        assert!(camera.is_frustum_dirty());
        camera.update_frustum_planes();
        assert!(!camera.is_frustum_dirty());
    }
}
