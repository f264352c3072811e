//! Owner of the frame buffers.
//!
//! Provides the [`Renderer`] struct which holds the color, depth and ambient
//! buffers behind a buffer-wide lock. Render passes take the read side and
//! lock individual rows; resizing takes the write side and swaps in fully
//! allocated buffers.

use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use super::framebuffer::FrameBuffers;
use crate::colors::Color;
use crate::error::Result;

#[derive(Debug)]
pub struct Renderer {
    buffers: RwLock<FrameBuffers>,
    clear_color: Color,
}

impl Renderer {
    pub fn new(width: u32, height: u32, clear_color: Color) -> Result<Self> {
        Ok(Self {
            buffers: RwLock::new(FrameBuffers::try_new(width, height, clear_color)?),
            clear_color,
        })
    }

    /// Shared access for a render pass.
    pub fn buffers(&self) -> RwLockReadGuard<'_, FrameBuffers> {
        self.buffers.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn width(&self) -> u32 {
        self.buffers().width()
    }

    pub fn height(&self) -> u32 {
        self.buffers().height()
    }

    pub fn size(&self) -> (u32, u32) {
        let buffers = self.buffers();
        (buffers.width(), buffers.height())
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Reallocates the buffers. On failure the previous buffers stay in place.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        // Allocate before taking the lock so in-flight readers are not stalled
        // by the allocation itself.
        let fresh = FrameBuffers::try_new(width, height, self.clear_color)?;
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        *buffers = fresh;
        log::debug!("framebuffer resized to {width}x{height}");
        Ok(())
    }

    /// Clears color to the clear color and depth to +inf.
    pub fn clear(&self) {
        self.buffers().clear(self.clear_color);
    }

    /// Row-major, top-to-bottom RGBA snapshot.
    pub fn to_image(&self) -> image::RgbaImage {
        let buffers = self.buffers();
        let mut img = image::RgbaImage::new(buffers.width(), buffers.height());
        for y in 0..buffers.height() {
            let row = buffers.lock_row(y);
            for (x, &color) in row.color.iter().enumerate() {
                img.put_pixel(x as u32, y, color.into());
            }
        }
        img
    }

    /// Packed ARGB8888 pixels, row-major, for display surfaces.
    pub fn color_argb(&self) -> Vec<u32> {
        self.buffers()
            .color_snapshot()
            .into_iter()
            .map(Color::to_argb)
            .collect()
    }

    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.buffers().depth_at(x, y)
    }

    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        self.buffers().color_at(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::render::framebuffer::{Fragment, FragmentTarget};

    #[test]
    fn resize_reallocates_and_clears() {
        let renderer = Renderer::new(4, 4, Color::BLACK).unwrap();
        renderer.buffers().target().commit(1, 1, Fragment::unlit(0.5, Color::WHITE));
        renderer.resize(8, 2).unwrap();
        assert_eq!(renderer.size(), (8, 2));
        assert_eq!(renderer.depth_at(1, 1), Some(f32::INFINITY));
    }

    #[test]
    fn failed_resize_keeps_previous_buffers() {
        let renderer = Renderer::new(4, 4, Color::WHITE).unwrap();
        assert!(matches!(
            renderer.resize(0, 4),
            Err(RenderError::InvalidDimensions { .. })
        ));
        assert!(renderer.resize(u32::MAX, 2).is_err());
        assert_eq!(renderer.size(), (4, 4));
        assert_eq!(renderer.color_at(3, 3), Some(Color::WHITE));
    }

    #[test]
    fn snapshot_is_row_major() {
        let renderer = Renderer::new(3, 2, Color::BLACK).unwrap();
        renderer.buffers().target().commit(2, 1, Fragment::unlit(0.1, Color::rgb(10, 20, 30)));
        let img = renderer.to_image();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [10, 20, 30, 255]);

        let argb = renderer.color_argb();
        assert_eq!(argb[5], Color::rgb(10, 20, 30).to_argb());
    }
}
