//! Clip-space clipping against the near plane.
//!
//! Clipping occurs after projection (in homogeneous clip space), before the
//! perspective divide. With a GL-style [-1, 1] depth range a vertex is in
//! front of the near plane when:
//!
//! ```text
//! z >= -w   =>   z + w >= 0
//! ```
//!
//! which is the clip-space form of `view_z < -near`.

use crate::math::vec2::Vec2;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;

/// A vertex in homogeneous clip space with interpolatable attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipSpaceVertex {
    /// Position in clip space (x, y, z, w) - before perspective divide
    pub position: Vec4,
    /// World-space position for lighting and shadow lookups
    pub world: Vec3,
    /// World-space normal
    pub normal: Vec3,
    /// Texture coordinates
    pub uv: Vec2,
}

impl ClipSpaceVertex {
    pub fn new(position: Vec4, world: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            world,
            normal,
            uv,
        }
    }

    /// Linearly interpolate all attributes between two vertices.
    /// Used when a polygon edge crosses a clipping plane.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            world: self.world.lerp(other.world, t),
            normal: self.normal.lerp(other.normal, t),
            uv: self.uv.lerp(other.uv, t),
        }
    }
}

/// Signed distance of a clip-space point to the near plane.
/// Positive = in front, negative = behind.
#[inline]
pub fn near_distance(p: Vec4) -> f32 {
    p.w + p.z
}

/// Maximum vertex count: clipping a triangle by one plane adds at most one.
const MAX_VERTICES: usize = 4;

/// A convex polygon in clip space produced by clipping one triangle.
///
/// Stored inline; clipping runs per triangle on the hot path.
#[derive(Clone, Copy, Debug)]
pub struct ClipSpacePolygon {
    vertices: [ClipSpaceVertex; MAX_VERTICES],
    len: usize,
}

impl ClipSpacePolygon {
    /// Create a polygon from a triangle (3 vertices).
    pub fn from_triangle(v0: ClipSpaceVertex, v1: ClipSpaceVertex, v2: ClipSpaceVertex) -> Self {
        Self {
            vertices: [v0, v1, v2, ClipSpaceVertex::default()],
            len: 3,
        }
    }

    fn empty() -> Self {
        Self {
            vertices: [ClipSpaceVertex::default(); MAX_VERTICES],
            len: 0,
        }
    }

    fn push(&mut self, v: ClipSpaceVertex) {
        self.vertices[self.len] = v;
        self.len += 1;
    }

    pub fn vertices(&self) -> &[ClipSpaceVertex] {
        &self.vertices[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the polygon has been completely clipped away.
    pub fn is_empty(&self) -> bool {
        self.len < 3
    }

    /// Number of vertices strictly in front of the near plane.
    pub fn count_in_front(&self) -> usize {
        self.vertices()
            .iter()
            .filter(|v| near_distance(v.position) > 0.0)
            .count()
    }

    /// Clip against the near plane (Sutherland-Hodgman).
    ///
    /// All three in front: returned unchanged. None in front: empty.
    /// Otherwise a triangle or quad with the crossing points inserted, each at
    /// `t = d_a / (d_a - d_b)` along the crossing edge.
    pub fn clip_against_near(&self) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        match self.count_in_front() {
            0 => return Self::empty(),
            n if n == self.len => return *self,
            _ => {}
        }

        let mut output = Self::empty();
        let vertices = self.vertices();

        for (i, current) in vertices.iter().enumerate() {
            let next = &vertices[(i + 1) % vertices.len()];

            let d1 = near_distance(current.position);
            let d2 = near_distance(next.position);

            let current_inside = d1 > 0.0;
            let next_inside = d2 > 0.0;

            if current_inside {
                output.push(*current);
            }
            if current_inside != next_inside {
                let t = d1 / (d1 - d2);
                output.push(current.lerp(next, t));
            }
        }

        output
    }

    /// Triangulate this convex polygon using fan triangulation.
    ///
    /// Returns an iterator of (v0, v1, v2) triangles.
    pub fn triangulate(&self) -> impl Iterator<Item = [ClipSpaceVertex; 3]> + '_ {
        let v = self.vertices();
        (1..v.len().saturating_sub(1)).map(move |i| [v[0], v[i], v[i + 1]])
    }
}

/// Clips a triangle against the near plane.
pub fn clip_near(triangle: [ClipSpaceVertex; 3]) -> ClipSpacePolygon {
    let [a, b, c] = triangle;
    ClipSpacePolygon::from_triangle(a, b, c).clip_against_near()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertex(x: f32, y: f32, z: f32, w: f32) -> ClipSpaceVertex {
        ClipSpaceVertex::new(
            Vec4::new(x, y, z, w),
            Vec3::new(x, y, z),
            Vec3::UP,
            Vec2::new(x, y),
        )
    }

    #[test]
    fn fully_in_front_is_unchanged() {
        let tri = [
            vertex(0.0, 0.0, 0.5, 1.0),
            vertex(1.0, 0.0, 0.5, 1.0),
            vertex(0.0, 1.0, 0.5, 1.0),
        ];
        let clipped = clip_near(tri);
        assert_eq!(clipped.len(), 3);
        assert_eq!(clipped.vertices(), &tri[..]);
        assert_eq!(clipped.triangulate().count(), 1);
    }

    #[test]
    fn fully_behind_is_discarded() {
        let tri = [
            vertex(0.0, 0.0, -2.0, 1.0),
            vertex(1.0, 0.0, -3.0, 1.0),
            vertex(0.0, 1.0, -2.5, 1.0),
        ];
        assert!(clip_near(tri).is_empty());
        assert_eq!(clip_near(tri).triangulate().count(), 0);
    }

    #[test]
    fn one_in_front_yields_triangle() {
        let tri = [
            vertex(0.0, 0.0, 0.0, 1.0),  // d = 1
            vertex(1.0, 0.0, -3.0, 1.0), // d = -2
            vertex(0.0, 1.0, -3.0, 1.0), // d = -2
        ];
        let clipped = clip_near(tri);
        assert_eq!(clipped.len(), 3);
        for v in clipped.vertices() {
            assert!(near_distance(v.position) >= -1e-6);
        }
        // Crossing at t = 1/3 along each edge.
        assert_relative_eq!(clipped.vertices()[1].uv.x, 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn two_in_front_yields_quad() {
        let tri = [
            vertex(0.0, 0.0, 0.0, 1.0),
            vertex(1.0, 0.0, 0.0, 1.0),
            vertex(0.0, 1.0, -3.0, 1.0),
        ];
        let clipped = clip_near(tri);
        assert_eq!(clipped.len(), 4);
        assert_eq!(clipped.triangulate().count(), 2);
        for v in clipped.vertices() {
            assert!(near_distance(v.position) >= -1e-6);
        }
    }
}
