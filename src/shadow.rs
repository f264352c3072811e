//! Shadow maps.
//!
//! A shadow map is a depth-only render of the scene from a light. Depths are
//! stored as `f32` bits in `AtomicU32` cells so triangles can be rasterized
//! in parallel; each texel keeps the minimum depth written to it, so the
//! result is independent of triangle order.
//!
//! # Lookup
//!
//! A world point is projected with the same light view-projection. It is lit
//! when it falls behind the light or outside the map, and in shadow when
//!
//! ```text
//! depth - bias >= stored
//! ```
//!
//! With PCF the test runs on 8 texels around the point and the majority
//! decides, stopping as soon as the outcome is settled.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::clipper::clip_space::{clip_near, ClipSpaceVertex};
use crate::config::ShadowConfig;
use crate::error::{RenderError, Result};
use crate::geometry::Geometry;
use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;
use crate::render::rasterizer::edgefunction::{ndc_to_screen, rasterize, ScreenVertex};

/// Rotated-grid offsets, in texels, sampled by percentage-closer filtering.
pub const PCF_OFFSETS: [(f32, f32); 8] = [
    (-1.5, -0.5),
    (0.5, -1.5),
    (1.5, 0.5),
    (-0.5, 1.5),
    (-1.0, -2.0),
    (2.0, -1.0),
    (1.0, 2.0),
    (-2.0, 1.0),
];

const PCF_SHADOWED: usize = 4;
const PCF_LIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowProjection {
    Orthographic,
    Perspective,
}

#[derive(Debug)]
pub struct ShadowMap {
    width: u32,
    height: u32,
    depth: Vec<AtomicU32>,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    kind: ShadowProjection,
}

impl Clone for ShadowMap {
    fn clone(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            depth: self
                .depth
                .iter()
                .map(|d| AtomicU32::new(d.load(Ordering::Relaxed)))
                .collect(),
            view: self.view,
            projection: self.projection,
            view_projection: self.view_projection,
            kind: self.kind,
        }
    }
}

impl ShadowMap {
    /// Creates a cleared map. Matrices start as identity until
    /// [`ShadowMap::set_matrices`] is called.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let len = width as usize * height as usize;
        let mut depth = Vec::new();
        depth.try_reserve_exact(len).map_err(|_| RenderError::Allocation {
            what: "shadow map",
            bytes: len * std::mem::size_of::<AtomicU32>(),
        })?;
        depth.extend((0..len).map(|_| AtomicU32::new(f32::INFINITY.to_bits())));

        Ok(Self {
            width,
            height,
            depth,
            view: Mat4::identity(),
            projection: Mat4::identity(),
            view_projection: Mat4::identity(),
            kind: ShadowProjection::Orthographic,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn projection_kind(&self) -> ShadowProjection {
        self.kind
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    pub fn set_matrices(&mut self, view: Mat4, projection: Mat4, kind: ShadowProjection) {
        self.view = view;
        self.projection = projection;
        self.view_projection = projection * view;
        self.kind = kind;
    }

    /// Resets every texel to `+inf`.
    pub fn clear(&self) {
        let cleared = f32::INFINITY.to_bits();
        self.depth
            .par_iter()
            .for_each(|cell| cell.store(cleared, Ordering::Relaxed));
    }

    /// Stored depth at a texel, `None` outside the map.
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width && y < self.height)
            .then(|| f32::from_bits(self.depth[self.index(x, y)].load(Ordering::Relaxed)))
    }

    pub fn depth_snapshot(&self) -> Vec<f32> {
        self.depth
            .iter()
            .map(|cell| f32::from_bits(cell.load(Ordering::Relaxed)))
            .collect()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Atomic `stored = min(stored, depth)`.
    #[inline]
    fn store_min(&self, x: u32, y: u32, depth: f32) {
        let cell = &self.depth[self.index(x, y)];
        let _ = cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            (depth < f32::from_bits(bits)).then_some(depth.to_bits())
        });
    }

    /// Rasterizes one triangle already transformed to light clip space.
    fn rasterize_clip_triangle(&self, clip: [Vec4; 3]) -> usize {
        if clip.iter().all(|c| c.w <= 0.0) {
            return 0;
        }

        let polygon = clip_near(clip.map(|position| ClipSpaceVertex {
            position,
            ..ClipSpaceVertex::default()
        }));

        polygon
            .triangulate()
            .map(|tri| {
                let screen = tri.map(|v| {
                    let ndc = v.position.perspective_divide();
                    let (x, y) = ndc_to_screen(ndc.x, ndc.y, self.width, self.height);
                    ScreenVertex::new(x, y, ndc.z)
                });
                rasterize(screen, self.width, self.height, |c| {
                    self.store_min(c.x, c.y, c.depth)
                })
            })
            .sum()
    }

    /// Depth-only pass over every visible geometry. Runs on the current rayon
    /// pool and returns the number of texels written.
    pub fn render(&self, geometries: &[&Geometry]) -> usize {
        self.clear();
        let light_vp = self.view_projection;

        geometries
            .par_iter()
            .filter(|g| g.visible)
            .flat_map_iter(|&g| {
                let mvp = light_vp * g.transform().model_matrix();
                g.triangles().iter().map(move |tri| (g, mvp, tri))
            })
            .map(|(g, mvp, tri)| {
                let clip = g.local_positions(tri).map(|p| mvp * Vec4::point(p));
                self.rasterize_clip_triangle(clip)
            })
            .sum()
    }

    /// Whether `world` is occluded from the light.
    pub fn is_in_shadow(&self, world: Vec3, config: &ShadowConfig) -> bool {
        let clip = self.view_projection * Vec4::point(world);
        if self.kind == ShadowProjection::Perspective && clip.w <= 0.0 {
            return false;
        }

        let ndc = clip.perspective_divide();
        let depth = ndc.z * 0.5 + 0.5;
        if self.kind == ShadowProjection::Orthographic && depth <= 0.0 {
            return false;
        }

        let (sx, sy) = ndc_to_screen(ndc.x, ndc.y, self.width, self.height);
        if self.texel(sx, sy).is_none() {
            return false;
        }

        let occluded = |x: f32, y: f32| -> bool {
            self.texel(x, y)
                .and_then(|(tx, ty)| self.depth_at(tx, ty))
                .is_some_and(|stored| depth - config.bias >= stored)
        };

        if !config.pcf {
            return occluded(sx, sy);
        }

        let (mut shadowed, mut lit) = (0, 0);
        for (dx, dy) in PCF_OFFSETS {
            if occluded(sx + dx, sy + dy) {
                shadowed += 1;
                if shadowed >= PCF_SHADOWED {
                    return true;
                }
            } else {
                lit += 1;
                if lit >= PCF_LIT {
                    return false;
                }
            }
        }
        false
    }

    /// Texel containing a screen-space point, if any.
    #[inline]
    fn texel(&self, x: f32, y: f32) -> Option<(u32, u32)> {
        let inside = x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32;
        inside.then(|| (x as u32, y as u32))
    }
}

/// Renders `map` from the given geometries. See [`ShadowMap::render`].
pub fn render_shadow_map(map: &ShadowMap, geometries: &[&Geometry]) -> usize {
    map.render(geometries)
}

/// Shadow lookup. See [`ShadowMap::is_in_shadow`].
pub fn is_in_shadow(map: &ShadowMap, world: Vec3, config: &ShadowConfig) -> bool {
    map.is_in_shadow(world, config)
}
