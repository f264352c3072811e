//! Triangle pipeline from clip space to the framebuffer.
//!
//! [`draw_triangle`] runs the per-triangle stages in order:
//!
//! 1. near-plane clipping in homogeneous space (fan-triangulated)
//! 2. perspective divide and viewport mapping
//! 3. barycentric coverage at pixel centers ([`edgefunction::rasterize`])
//! 4. early depth test, perspective-correct attribute interpolation
//! 5. shading ([`shader::PixelShader`]) and the atomic depth test-and-write

pub mod edgefunction;
pub mod shader;

pub use edgefunction::{barycentric, ndc_to_screen, rasterize, Coverage, ScreenVertex};
pub use shader::{BlinnPhongShader, FlatShader, FragmentInput, PixelShader, Shaded, ShadingContext};

use crate::clipper::clip_space::{clip_near, ClipSpaceVertex};
use crate::render::framebuffer::{Fragment, FragmentTarget};

/// Draws one triangle. Returns the number of fragments written.
pub fn draw_triangle<T, S>(vertices: [ClipSpaceVertex; 3], shader: &S, target: &mut T) -> usize
where
    T: FragmentTarget,
    S: PixelShader + ?Sized,
{
    let polygon = clip_near(vertices);
    polygon
        .triangulate()
        .map(|tri| draw_clipped(tri, shader, target))
        .sum()
}

/// Draws a triangle known to lie in front of the near plane.
pub fn draw_clipped<T, S>(vertices: [ClipSpaceVertex; 3], shader: &S, target: &mut T) -> usize
where
    T: FragmentTarget,
    S: PixelShader + ?Sized,
{
    let (width, height) = (target.width(), target.height());
    let inv_w = vertices.map(|v| 1.0 / v.position.w);
    let screen = vertices.map(|v| {
        let ndc = v.position.perspective_divide();
        let (x, y) = ndc_to_screen(ndc.x, ndc.y, width, height);
        ScreenVertex::new(x, y, ndc.z)
    });

    let mut written = 0;
    rasterize(screen, width, height, |c| {
        if !target.depth_test(c.x, c.y, c.depth) {
            return;
        }
        let input = interpolate(&vertices, inv_w, c.weights);
        let shaded = shader.shade(&input);
        let fragment = Fragment {
            depth: c.depth,
            color: shaded.color,
            lit: shaded.lit,
            ambient: shaded.ambient,
        };
        if target.commit(c.x, c.y, fragment) {
            written += 1;
        }
    });
    written
}

/// Perspective-correct interpolation of the vertex attributes.
///
/// Screen-space weights are reweighted by `1/w` so attributes vary linearly
/// across the triangle in world space rather than on screen.
#[inline]
pub fn interpolate(vertices: &[ClipSpaceVertex; 3], inv_w: [f32; 3], weights: [f32; 3]) -> FragmentInput {
    let p = [weights[0] * inv_w[0], weights[1] * inv_w[1], weights[2] * inv_w[2]];
    let sum = p[0] + p[1] + p[2];
    let [a, b, c] = if sum > 0.0 && sum.is_finite() {
        [p[0] / sum, p[1] / sum, p[2] / sum]
    } else {
        weights
    };

    let [v0, v1, v2] = vertices;
    FragmentInput {
        world: v0.world * a + v1.world * b + v2.world * c,
        normal: v0.normal * a + v1.normal * b + v2.normal * c,
        uv: v0.uv * a + v1.uv * b + v2.uv * c,
    }
}
