//! Barycentric bounding-box rasterization.
//!
//! This module implements triangle coverage the way GPUs do it: iterate the
//! pixels of the triangle's screen-space bounding box and test each pixel
//! center against the triangle using barycentric weights.
//!
//! # Barycentric Weights
//!
//! For a screen triangle (a, b, c) and point p, the weights are obtained from
//! the 2D determinant form:
//!
//! ```text
//! denom = (b.y - c.y)(a.x - c.x) + (c.x - b.x)(a.y - c.y)
//! u     = ((b.y - c.y)(p.x - c.x) + (c.x - b.x)(p.y - c.y)) / denom
//! v     = ((c.y - a.y)(p.x - c.x) + (a.x - c.x)(p.y - c.y)) / denom
//! w     = 1 - u - v
//! ```
//!
//! A point is covered when no weight is negative, for either winding.
//!
//! # Degenerate Triangles
//!
//! When `|denom|` is below [`DEGENERATE_EPSILON`] the weights are the
//! sentinel `[-1, -1, -1]`, which every coverage test rejects.
//!
//! # References
//!
//! - Juan Pineda, "A Parallel Algorithm for Polygon Rasterization" (1988)
//! - Scratchapixel: <https://www.scratchapixel.com/lessons/3d-basic-rendering/rasterization-practical-implementation>

use crate::math::vec2::Vec2;

/// Below this absolute determinant a triangle has no usable area.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Weights returned for a degenerate triangle.
pub const DEGENERATE_WEIGHTS: [f32; 3] = [-1.0, -1.0, -1.0];

/// A vertex after perspective divide and viewport mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenVertex {
    /// Pixel coordinates, y growing downward.
    pub x: f32,
    pub y: f32,
    /// NDC depth in [-1, 1].
    pub z: f32,
}

impl ScreenVertex {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    fn xy(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A covered pixel reported by [`rasterize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coverage {
    pub x: u32,
    pub y: u32,
    /// Screen-space barycentric weights of the pixel center.
    pub weights: [f32; 3],
    /// Depth remapped to [0, 1].
    pub depth: f32,
}

/// Barycentric weights of `p` with respect to triangle (a, b, c).
///
/// Returns [`DEGENERATE_WEIGHTS`] when the triangle has (nearly) zero area.
#[inline]
pub fn barycentric(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> [f32; 3] {
    let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denom.abs() < DEGENERATE_EPSILON {
        return DEGENERATE_WEIGHTS;
    }
    let u = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / denom;
    let v = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / denom;
    [u, v, 1.0 - u - v]
}

/// Maps NDC x/y to pixel coordinates (origin top-left, y down).
#[inline]
pub fn ndc_to_screen(ndc_x: f32, ndc_y: f32, width: u32, height: u32) -> (f32, f32) {
    (
        (ndc_x + 1.0) * 0.5 * width as f32,
        (1.0 - (ndc_y + 1.0) * 0.5) * height as f32,
    )
}

/// Rasterizes one screen-space triangle into a `width` x `height` viewport.
///
/// Pixels are sampled at their centers. For every pixel inside the triangle
/// whose interpolated depth lies in [0, 1], `visit` is called with the
/// weights and depth. Returns the number of covered pixels.
pub fn rasterize<F>(vertices: [ScreenVertex; 3], width: u32, height: u32, mut visit: F) -> usize
where
    F: FnMut(Coverage),
{
    if width == 0 || height == 0 {
        return 0;
    }
    let [v0, v1, v2] = vertices;

    // ─────────────────────────────────────────────────────────────────────
    // Step 1: Integer bounding box, clamped to the viewport
    // ─────────────────────────────────────────────────────────────────────
    let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0);
    let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0);
    let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(width as f32 - 1.0);
    let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(height as f32 - 1.0);

    // Also rejects NaN coordinates.
    if !(min_x <= max_x && min_y <= max_y) {
        return 0;
    }
    let (min_x, max_x, min_y, max_y) = (min_x as u32, max_x as u32, min_y as u32, max_y as u32);

    let (a, b, c) = (v0.xy(), v1.xy(), v2.xy());
    let mut covered = 0;

    // ─────────────────────────────────────────────────────────────────────
    // Step 2: Per-pixel coverage and depth
    // ─────────────────────────────────────────────────────────────────────
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let weights = barycentric(a, b, c, p);
            if weights.iter().any(|&w| w < 0.0) {
                continue;
            }

            let ndc_z = weights[0] * v0.z + weights[1] * v1.z + weights[2] * v2.z;
            let depth = ndc_z * 0.5 + 0.5;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            covered += 1;
            visit(Coverage {
                x,
                y,
                weights,
                depth,
            });
        }
    }
    covered
}
