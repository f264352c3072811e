use std::sync::Arc;

use crate::colors::Color;
use crate::error::{RenderError, Result};
use crate::math::vec2::Vec2;

/// An in-memory 2D texture. Decoding image files is left to the caller.
#[derive(Debug, Clone)]
pub struct Texture {
    data: Vec<Color>, // Row-major, top row first.
    width: u32,
    height: u32,
}

impl Texture {
    /// Wraps row-major pixel data, top row first.
    pub fn from_pixels(width: u32, height: u32, data: Vec<Color>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RenderError::InvalidTexture(format!(
                "{}x{} texture needs {} pixels, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a decoded RGBA image.
    pub fn from_image(img: &image::RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::from_pixels(width, height, img.pixels().map(|p| Color::from(*p)).collect())
    }

    /// Two-color checkerboard with `cells` squares per side.
    pub fn checkerboard(size: u32, cells: u32, a: Color, b: Color) -> Result<Self> {
        let cell = (size / cells.max(1)).max(1);
        let data = (0..size)
            .flat_map(|y| {
                (0..size).map(move |x| if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b })
            })
            .collect();
        Self::from_pixels(size, size, data)
    }

    /// Sample the texture at UV coordinates using nearest-neighbor filtering.
    ///
    /// # UV Coordinate Convention
    /// - (0,0) is the bottom-left corner; rows are stored top-left origin,
    ///   so V is flipped: `v_corrected = 1.0 - v`
    /// - Wraps (repeat) outside [0,1]
    #[inline]
    pub fn sample(&self, uv: Vec2) -> Color {
        // rem_euclid keeps negative coordinates wrapping the right way.
        let u = uv.x.rem_euclid(1.0);
        let v = (1.0 - uv.y).rem_euclid(1.0);

        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);

        self.data[(y * self.width + x) as usize]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

pub type SharedTexture = Arc<Texture>;

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Texture {
        // top row: red, green; bottom row: blue, white
        Texture::from_pixels(
            2,
            2,
            vec![
                Color::rgb(255, 0, 0),
                Color::rgb(0, 255, 0),
                Color::rgb(0, 0, 255),
                Color::WHITE,
            ],
        )
        .unwrap()
    }

    #[test]
    fn v_zero_is_bottom_row() {
        let t = two_by_two();
        assert_eq!(t.sample(Vec2::new(0.25, 0.25)), Color::rgb(0, 0, 255));
        assert_eq!(t.sample(Vec2::new(0.75, 0.75)), Color::rgb(0, 255, 0));
    }

    #[test]
    fn uv_wraps() {
        let t = two_by_two();
        assert_eq!(t.sample(Vec2::new(1.25, -0.75)), t.sample(Vec2::new(0.25, 0.25)));
    }

    #[test]
    fn mismatched_pixel_count_rejected() {
        let err = Texture::from_pixels(3, 3, vec![Color::BLACK; 4]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidTexture(_)));
        assert!(Texture::from_pixels(0, 3, Vec::new()).is_err());
    }
}
