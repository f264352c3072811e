//! Pixel shaders for triangle rasterization.
//!
//! The rasterizer owns coverage, depth and attribute interpolation; a
//! [`PixelShader`] turns the interpolated attributes of one fragment into a
//! color. This mirrors how GPUs split fixed-function rasterization from the
//! programmable fragment stage.

use crate::colors::Color;
use crate::config::{ShadingConfig, ShadowConfig, TextureMode};
use crate::light::Light;
use crate::material::Material;
use crate::math::vec2::Vec2;
use crate::math::vec3::Vec3;

/// Perspective-correct attributes of one fragment.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FragmentInput {
    pub world: Vec3,
    /// Interpolated vertex normal; not necessarily unit length.
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Shader output: the final color plus its unclamped direct and ambient
/// terms, so a later pass can rescale ambient before clamping again.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shaded {
    pub color: Color,
    pub lit: [f32; 3],
    pub ambient: [f32; 3],
}

impl Shaded {
    fn from_terms(lit: Vec3, ambient: Vec3) -> Self {
        Self {
            color: Color::from_vec3(lit + ambient),
            lit: [lit.x, lit.y, lit.z],
            ambient: [ambient.x, ambient.y, ambient.z],
        }
    }
}

/// Per-fragment shading stage.
pub trait PixelShader {
    fn shade(&self, input: &FragmentInput) -> Shaded;
}

/// Returns a constant color. Handy for debugging coverage.
pub struct FlatShader {
    color: Color,
}

impl FlatShader {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl PixelShader for FlatShader {
    #[inline]
    fn shade(&self, _input: &FragmentInput) -> Shaded {
        Shaded::from_terms(self.color.to_vec3(), Vec3::ZERO)
    }
}

/// Scene-wide inputs shared by every triangle of a frame.
#[derive(Clone, Copy)]
pub struct ShadingContext<'a> {
    pub lights: &'a [Light],
    pub eye: Vec3,
    pub shading: &'a ShadingConfig,
    pub shadow: &'a ShadowConfig,
    pub texture_mode: TextureMode,
}

/// Multi-light Blinn-Phong with shadow lookups.
///
/// For every light:
///
/// ```text
/// diffuse  = base ⊙ radiance · max(0, N·L)
/// specular = material.specular ⊙ radiance · max(0, N·H)^shininess
/// ```
///
/// where `radiance` folds in light color, intensity, attenuation and the
/// shadow factor. The sum plus `base · ambient_strength` is clamped to 0..=255.
pub struct BlinnPhongShader<'a> {
    ctx: ShadingContext<'a>,
    material: &'a Material,
    base_color: Color,
    /// Face normal and per-light dots for flat-shaded triangles.
    flat: Option<(Vec3, &'a [Option<f32>])>,
}

impl<'a> BlinnPhongShader<'a> {
    /// `base_color` is the triangle's cached color. Pass `flat` for triangles
    /// shaded with their face normal so uniform lights reuse the cached dots.
    pub fn new(
        ctx: ShadingContext<'a>,
        material: &'a Material,
        base_color: Color,
        flat: Option<(Vec3, &'a [Option<f32>])>,
    ) -> Self {
        Self {
            ctx,
            material,
            base_color,
            flat,
        }
    }

    /// Base color in 0..=255 space for this fragment.
    #[inline]
    fn base(&self, uv: Vec2) -> Vec3 {
        match (self.ctx.texture_mode, self.material.diffuse_texture.as_ref()) {
            (TextureMode::PerFragment, Some(texture)) => {
                texture.sample(uv).modulate(self.material.diffuse).to_vec3()
            }
            _ => self.base_color.to_vec3(),
        }
    }

    fn shadow_factor(&self, light: &Light, world: Vec3) -> f32 {
        if !self.ctx.shadow.enabled {
            return 1.0;
        }
        match light.active_shadow_map() {
            Some(map) if map.is_in_shadow(world, self.ctx.shadow) => 1.0 - self.ctx.shadow.strength,
            _ => 1.0,
        }
    }
}

impl PixelShader for BlinnPhongShader<'_> {
    fn shade(&self, input: &FragmentInput) -> Shaded {
        let base = self.base(input.uv);
        let normal = match self.flat {
            Some((face, _)) => face,
            None => input.normal.normalize(),
        };
        let to_eye = (self.ctx.eye - input.world).normalize();
        let specular_color = self.material.specular.to_vec3();
        let use_specular = self.ctx.shading.specular
            && self.material.shininess > 0.0
            && self.material.specular != Color::BLACK;

        let mut lit = Vec3::ZERO;
        for (i, light) in self.ctx.lights.iter().enumerate() {
            let to_light = light.direction_to_light(input.world);
            let cached = self
                .flat
                .and_then(|(_, dots)| dots.get(i).copied().flatten());
            let n_dot_l = cached.unwrap_or_else(|| normal.dot(to_light).max(0.0));
            if n_dot_l <= 0.0 {
                continue;
            }

            let attenuation = if light.is_uniform() {
                1.0
            } else {
                light.attenuation(light.position().distance(input.world))
            };
            let shadow = self.shadow_factor(light, input.world);
            let radiance = light.radiance() * (attenuation * shadow);

            lit += base.mul_elem(radiance) * n_dot_l;

            if use_specular {
                let half = (to_light + to_eye).normalize();
                let n_dot_h = normal.dot(half).max(0.0);
                lit += specular_color.mul_elem(radiance) * n_dot_h.powf(self.material.shininess);
            }
        }

        let ambient = base * self.ctx.shading.ambient_strength;
        Shaded::from_terms(lit, ambient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn unlit_ambient() -> ShadingConfig {
        ShadingConfig {
            ambient_strength: 0.0,
            specular: false,
        }
    }

    fn context<'a>(lights: &'a [Light], shading: &'a ShadingConfig, shadow: &'a ShadowConfig) -> ShadingContext<'a> {
        ShadingContext {
            lights,
            eye: Vec3::new(0.0, 5.0, 5.0),
            shading,
            shadow,
            texture_mode: TextureMode::PerTriangle,
        }
    }

    fn upward_fragment() -> FragmentInput {
        FragmentInput {
            world: Vec3::ZERO,
            normal: Vec3::UP,
            uv: Vec2::ZERO,
        }
    }

    #[test]
    fn single_lit_triangle_gets_full_diffuse() {
        let lights = [Light::directional("key", Vec3::DOWN)];
        let (shading, shadow) = (unlit_ambient(), ShadowConfig::default());
        let material = Material::new("paint").with_diffuse(Color::rgb(100, 150, 200));
        let shader = BlinnPhongShader::new(context(&lights, &shading, &shadow), &material, material.diffuse, None);

        let out = shader.shade(&upward_fragment());
        assert_eq!(out.color, Color::rgb(100, 150, 200));
    }

    #[test]
    fn intensity_scales_and_clamps() {
        let lights = [Light::directional("key", Vec3::DOWN).with_color(Color::WHITE, 2.0)];
        let (shading, shadow) = (unlit_ambient(), ShadowConfig::default());
        let material = Material::new("paint").with_diffuse(Color::rgb(100, 150, 200));
        let shader = BlinnPhongShader::new(context(&lights, &shading, &shadow), &material, material.diffuse, None);

        let out = shader.shade(&upward_fragment());
        assert_eq!(out.color, Color::rgb(200, 255, 255));
        // The direct term is kept unclamped for the occlusion pass.
        assert_relative_eq!(out.lit[2], 400.0, epsilon = 1e-3);
    }

    #[test]
    fn light_from_below_leaves_only_ambient() {
        let lights = [Light::directional("key", Vec3::UP)];
        let shading = ShadingConfig {
            ambient_strength: 0.5,
            specular: true,
        };
        let shadow = ShadowConfig::default();
        let material = Material::new("paint").with_diffuse(Color::rgb(200, 100, 50));
        let shader = BlinnPhongShader::new(context(&lights, &shading, &shadow), &material, material.diffuse, None);

        let out = shader.shade(&upward_fragment());
        assert_eq!(out.color, Color::rgb(100, 50, 25));
        assert_eq!(out.ambient, [100.0, 50.0, 25.0]);
    }

    #[test]
    fn flat_dots_override_fragment_normal() {
        let lights = [Light::directional("key", Vec3::DOWN)];
        let (shading, shadow) = (unlit_ambient(), ShadowConfig::default());
        let material = Material::new("paint").with_diffuse(Color::rgb(200, 200, 200));
        let dots = [Some(0.5)];
        let shader = BlinnPhongShader::new(
            context(&lights, &shading, &shadow),
            &material,
            material.diffuse,
            Some((Vec3::UP, &dots)),
        );

        assert_eq!(shader.shade(&upward_fragment()).color, Color::rgb(100, 100, 100));
    }

    #[test]
    fn point_light_attenuates_diffuse() {
        // k = 1, d = 1: half the light arrives.
        let lights = [Light::point("bulb", Vec3::new(0.0, 1.0, 0.0), 1.0)];
        let (shading, shadow) = (unlit_ambient(), ShadowConfig::default());
        let material = Material::new("paint").with_diffuse(Color::rgb(200, 100, 40));
        let shader = BlinnPhongShader::new(context(&lights, &shading, &shadow), &material, material.diffuse, None);

        assert_eq!(shader.shade(&upward_fragment()).color, Color::rgb(100, 50, 20));
    }

    #[test]
    fn specular_highlight_adds_light() {
        let lights = [Light::directional("key", Vec3::DOWN)];
        let shading = ShadingConfig {
            ambient_strength: 0.0,
            specular: true,
        };
        let shadow = ShadowConfig::default();
        let material = Material::new("gloss")
            .with_diffuse(Color::rgb(100, 0, 0))
            .with_specular(Color::WHITE, 8.0);
        let mut ctx = context(&lights, &shading, &shadow);
        ctx.eye = Vec3::new(0.0, 10.0, 0.0);
        let shader = BlinnPhongShader::new(ctx, &material, material.diffuse, None);

        // Eye and light both straight above: N·H = 1.
        assert_eq!(shader.shade(&upward_fragment()).color, Color::rgb(255, 255, 255));
    }

    #[test]
    fn per_fragment_texture_is_sampled() {
        let lights = [Light::directional("key", Vec3::DOWN)];
        let (shading, shadow) = (unlit_ambient(), ShadowConfig::default());
        let texture = Texture::from_pixels(1, 1, vec![Color::rgb(0, 255, 0)]).unwrap();
        let material = Material::new("tex").with_diffuse(Color::WHITE).with_texture(Arc::new(texture));
        let mut ctx = context(&lights, &shading, &shadow);
        ctx.texture_mode = TextureMode::PerFragment;
        let shader = BlinnPhongShader::new(ctx, &material, Color::rgb(9, 9, 9), None);

        assert_eq!(shader.shade(&upward_fragment()).color, Color::rgb(0, 255, 0));
    }
}
