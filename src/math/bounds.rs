//! Axis-aligned bounding boxes.

use super::mat4::Mat4;
use super::vec3::Vec3;

/// Axis-aligned bounding box given by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

impl BoundingBox {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. An empty iterator yields a
    /// degenerate box at the origin.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        iter.fold(Self::new(first, first), |b, p| {
            Self::new(b.min.min(p), b.max.max(p))
        })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box enclosing this box after an affine transform.
    pub fn transformed(&self, m: &Mat4) -> Self {
        Self::from_points(self.corners().into_iter().map(|c| m.transform_point(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_points_encloses_all() {
        let b = BoundingBox::from_points([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 3.0, 2.0),
            Vec3::new(0.5, 0.0, -4.0),
        ]);
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -4.0));
        assert_eq!(b.max, Vec3::new(1.0, 3.0, 2.0));
        assert!(b.contains(Vec3::ZERO));
    }

    #[test]
    fn transformed_box_grows_under_rotation() {
        let unit = BoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::ONE);
        let rotated = unit.transformed(&Mat4::rotation_y(std::f32::consts::FRAC_PI_4));
        assert_relative_eq!(rotated.max.x, 2.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(rotated.max.y, 1.0, epsilon = 1e-6);
    }
}
