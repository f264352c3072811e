//! RGBA color value type.

use crate::math::vec3::Vec3;

/// 8-bit per channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREY: Color = Color::rgb(166, 166, 166);
    /// Loud magenta for highlighting.
    pub const WARNING: Color = Color::rgb(226, 59, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Builds an opaque color from channels in 0..=255 float space,
    /// clamping each channel. NaN maps to 0.
    pub fn from_rgb_f32(r: f32, g: f32, b: f32) -> Self {
        Self::rgb(clamp_channel(r), clamp_channel(g), clamp_channel(b))
    }

    /// Same as [`Color::from_rgb_f32`] for a vector of channels.
    pub fn from_vec3(v: Vec3) -> Self {
        Self::from_rgb_f32(v.x, v.y, v.z)
    }

    /// Channels as floats in 0..=255.
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32)
    }

    /// Channels as floats in 0..=1.
    pub fn to_unit_vec3(self) -> Vec3 {
        self.to_vec3() / 255.0
    }

    /// Packed ARGB8888, the layout most display surfaces expect.
    pub fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub fn from_argb(argb: u32) -> Self {
        Self::new(
            (argb >> 16) as u8,
            (argb >> 8) as u8,
            argb as u8,
            (argb >> 24) as u8,
        )
    }

    /// Multiplies RGB by `factor`, saturating at 255. Alpha is kept.
    pub fn scale(self, factor: f32) -> Self {
        Self {
            a: self.a,
            ..Self::from_vec3(self.to_vec3() * factor)
        }
    }

    /// Channel-wise product, as used to tint a texture by a material.
    pub fn modulate(self, other: Color) -> Self {
        let mul = |a: u8, b: u8| ((a as u16 * b as u16) / 255) as u8;
        Self::new(
            mul(self.r, other.r),
            mul(self.g, other.g),
            mul(self.b, other.b),
            mul(self.a, other.a),
        )
    }

    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| clamp_channel(a as f32 + (b as f32 - a as f32) * t);
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
            )),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }
}

#[inline]
fn clamp_channel(value: f32) -> u8 {
    // `as` maps NaN to 0.
    value.clamp(0.0, 255.0).round() as u8
}

impl From<image::Rgba<u8>> for Color {
    fn from(p: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = p.0;
        Self::new(r, g, b, a)
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(c: Color) -> Self {
        image::Rgba([c.r, c.g, c.b, c.a])
    }
}
