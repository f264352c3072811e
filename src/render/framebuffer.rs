//! Color, depth and lighting buffers, and the targets fragments are written to.
//!
//! Depth is stored in [0, 1] with smaller values closer to the camera; a
//! cleared buffer holds `+inf`. A fragment wins a pixel only when its depth is
//! strictly less than the stored one, so the final image does not depend on
//! the order triangles are rasterized in.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;

use crate::colors::Color;
use crate::error::{RenderError, Result};

/// One shaded sample ready to be written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub depth: f32,
    pub color: Color,
    /// Unclamped direct lighting; `color` is `lit + ambient` clamped.
    pub lit: [f32; 3],
    /// Ambient part of `color`, kept for the occlusion pass.
    pub ambient: [f32; 3],
}

impl Fragment {
    /// A fragment whose whole color is direct light, with no ambient share.
    pub fn unlit(depth: f32, color: Color) -> Self {
        let c = color.to_vec3();
        Self {
            depth,
            color,
            lit: [c.x, c.y, c.z],
            ambient: [0.0; 3],
        }
    }
}

/// Destination of rasterized fragments.
pub trait FragmentTarget {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Cheap pre-check used to skip shading hidden fragments. A `true` result
    /// may still lose in [`FragmentTarget::commit`].
    fn depth_test(&mut self, x: u32, y: u32, depth: f32) -> bool;

    /// Atomically tests `fragment.depth < stored` and writes depth, color and
    /// the lighting terms when it passes. Returns whether the fragment was written.
    fn commit(&mut self, x: u32, y: u32, fragment: Fragment) -> bool;
}

/// One scanline of the frame.
#[derive(Clone, Debug)]
pub struct Row {
    pub color: Vec<Color>,
    pub depth: Vec<f32>,
    pub lit: Vec<[f32; 3]>,
    pub ambient: Vec<[f32; 3]>,
}

impl Row {
    fn try_new(width: usize, clear: Color) -> Result<Self> {
        Ok(Self {
            color: filled(width, clear, "color row")?,
            depth: filled(width, f32::INFINITY, "depth row")?,
            lit: filled(width, [0.0; 3], "lit row")?,
            ambient: filled(width, [0.0; 3], "ambient row")?,
        })
    }

    pub fn clear(&mut self, color: Color) {
        self.color.fill(color);
        self.depth.fill(f32::INFINITY);
        self.lit.fill([0.0; 3]);
        self.ambient.fill([0.0; 3]);
    }

    #[inline]
    fn write_if_closer(&mut self, x: usize, fragment: Fragment) -> bool {
        if fragment.depth < self.depth[x] {
            self.depth[x] = fragment.depth;
            self.color[x] = fragment.color;
            self.lit[x] = fragment.lit;
            self.ambient[x] = fragment.ambient;
            true
        } else {
            false
        }
    }
}

/// Allocates a buffer with `try_reserve` so exhaustion becomes an error.
fn filled<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| RenderError::Allocation {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, value);
    Ok(v)
}

/// Largest accepted side length in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// The shared frame: one lock per row.
#[derive(Debug)]
pub struct FrameBuffers {
    width: u32,
    height: u32,
    rows: Vec<Mutex<Row>>,
}

impl FrameBuffers {
    /// Allocates every row up front. Fails without side effects.
    pub fn try_new(width: u32, height: u32, clear: Color) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let mut rows = Vec::new();
        rows.try_reserve_exact(height as usize)
            .map_err(|_| RenderError::Allocation {
                what: "row table",
                bytes: height as usize * std::mem::size_of::<Mutex<Row>>(),
            })?;
        for _ in 0..height {
            rows.push(Mutex::new(Row::try_new(width as usize, clear)?));
        }
        Ok(Self {
            width,
            height,
            rows,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Locks row `y`. A row poisoned by a panicking worker is still usable:
    /// every write leaves it consistent.
    #[inline]
    pub fn lock_row(&self, y: u32) -> MutexGuard<'_, Row> {
        self.rows[y as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Resets every buffer, one row per task.
    pub fn clear(&self, color: Color) {
        self.rows.par_iter().for_each(|row| {
            row.lock().unwrap_or_else(PoisonError::into_inner).clear(color);
        });
    }

    /// Depth at (x, y), `None` outside the frame.
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.lock_row(y).depth[x as usize])
    }

    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.width && y < self.height).then(|| self.lock_row(y).color[x as usize])
    }

    /// Copies the depth buffer row-major.
    pub fn depth_snapshot(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            out.extend_from_slice(&self.lock_row(y).depth);
        }
        out
    }

    /// Copies the color buffer row-major.
    pub fn color_snapshot(&self) -> Vec<Color> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            out.extend_from_slice(&self.lock_row(y).color);
        }
        out
    }

    /// A [`FragmentTarget`] writing straight into these buffers.
    pub fn target(&self) -> RowLockedTarget<'_> {
        RowLockedTarget { buffers: self }
    }

    /// Folds a worker's private buffers into the frame. Each pixel keeps the
    /// smaller depth; ties keep what is already stored.
    pub fn merge(&self, local: &LocalBuffers) {
        debug_assert_eq!((local.width, local.height), (self.width, self.height));
        let width = self.width as usize;
        self.rows.par_iter().enumerate().for_each(|(y, row)| {
            let span = y * width..(y + 1) * width;
            let depths = &local.depth[span.clone()];
            if depths.iter().all(|d| d.is_infinite()) {
                return;
            }
            let mut row = row.lock().unwrap_or_else(PoisonError::into_inner);
            for (x, i) in span.enumerate() {
                row.write_if_closer(
                    x,
                    Fragment {
                        depth: local.depth[i],
                        color: local.color[i],
                        lit: local.lit[i],
                        ambient: local.ambient[i],
                    },
                );
            }
        });
    }
}

/// Shared target: every pixel access goes through its row lock.
pub struct RowLockedTarget<'a> {
    buffers: &'a FrameBuffers,
}

impl FragmentTarget for RowLockedTarget<'_> {
    fn width(&self) -> u32 {
        self.buffers.width
    }

    fn height(&self) -> u32 {
        self.buffers.height
    }

    #[inline]
    fn depth_test(&mut self, x: u32, y: u32, depth: f32) -> bool {
        depth < self.buffers.lock_row(y).depth[x as usize]
    }

    #[inline]
    fn commit(&mut self, x: u32, y: u32, fragment: Fragment) -> bool {
        self.buffers.lock_row(y).write_if_closer(x as usize, fragment)
    }
}

/// Private buffers owned by one worker, merged after the pass.
#[derive(Debug)]
pub struct LocalBuffers {
    width: u32,
    height: u32,
    color: Vec<Color>,
    depth: Vec<f32>,
    lit: Vec<[f32; 3]>,
    ambient: Vec<[f32; 3]>,
}

impl LocalBuffers {
    pub fn try_new(width: u32, height: u32) -> Result<Self> {
        let len = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            color: filled(len, Color::BLACK, "worker color buffer")?,
            depth: filled(len, f32::INFINITY, "worker depth buffer")?,
            lit: filled(len, [0.0; 3], "worker lit buffer")?,
            ambient: filled(len, [0.0; 3], "worker ambient buffer")?,
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl FragmentTarget for LocalBuffers {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn depth_test(&mut self, x: u32, y: u32, depth: f32) -> bool {
        depth < self.depth[self.index(x, y)]
    }

    #[inline]
    fn commit(&mut self, x: u32, y: u32, fragment: Fragment) -> bool {
        let i = self.index(x, y);
        if fragment.depth < self.depth[i] {
            self.depth[i] = fragment.depth;
            self.color[i] = fragment.color;
            self.lit[i] = fragment.lit;
            self.ambient[i] = fragment.ambient;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(depth: f32, color: Color) -> Fragment {
        Fragment::unlit(depth, color)
    }

    #[test]
    fn new_buffers_are_cleared() {
        let fb = FrameBuffers::try_new(4, 3, Color::WHITE).unwrap();
        assert_eq!(fb.depth_at(3, 2), Some(f32::INFINITY));
        assert_eq!(fb.color_at(0, 0), Some(Color::WHITE));
        assert_eq!(fb.depth_at(4, 0), None);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            FrameBuffers::try_new(0, 10, Color::BLACK),
            Err(RenderError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn depth_test_is_strict() {
        let fb = FrameBuffers::try_new(2, 2, Color::BLACK).unwrap();
        let mut target = fb.target();
        assert!(target.commit(1, 1, fragment(0.5, Color::WHITE)));
        assert!(!target.commit(1, 1, fragment(0.5, Color::rgb(1, 2, 3))));
        assert!(!target.depth_test(1, 1, 0.5));
        assert!(target.commit(1, 1, fragment(0.25, Color::rgb(1, 2, 3))));
        assert_eq!(fb.color_at(1, 1), Some(Color::rgb(1, 2, 3)));
        assert_eq!(fb.depth_at(1, 1), Some(0.25));
    }

    #[test]
    fn merge_keeps_nearest() {
        let fb = FrameBuffers::try_new(2, 1, Color::BLACK).unwrap();
        fb.target().commit(0, 0, fragment(0.3, Color::WHITE));

        let mut local = LocalBuffers::try_new(2, 1).unwrap();
        local.commit(0, 0, fragment(0.6, Color::rgb(9, 9, 9)));
        local.commit(1, 0, fragment(0.6, Color::rgb(9, 9, 9)));
        fb.merge(&local);

        assert_eq!(fb.color_at(0, 0), Some(Color::WHITE));
        assert_eq!(fb.color_at(1, 0), Some(Color::rgb(9, 9, 9)));
    }

    #[test]
    fn clear_resets_depth() {
        let fb = FrameBuffers::try_new(2, 2, Color::BLACK).unwrap();
        fb.target().commit(0, 1, fragment(0.1, Color::WHITE));
        fb.clear(Color::BLACK);
        assert_eq!(fb.depth_at(0, 1), Some(f32::INFINITY));
        assert_eq!(fb.color_at(0, 1), Some(Color::BLACK));
    }
}
