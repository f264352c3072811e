//! Render configuration.
//!
//! Plain structs with public fields and sensible defaults. Call
//! [`RenderConfig::validate`] (done by [`Scene::new`](crate::scene::Scene::new))
//! before handing a hand-built config to the pipeline.

use crate::colors::Color;
use crate::error::{RenderError, Result};

/// How workers write fragments into the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramebufferStrategy {
    /// One shared framebuffer, one lock per row.
    #[default]
    RowLocked,
    /// Each worker rasterizes into private buffers, merged by depth afterwards.
    PerWorker,
}

/// Where the texture contributes to the base color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMode {
    /// Average of the texture at the three vertex UVs, cached per triangle.
    #[default]
    PerTriangle,
    /// Texture sampled at the interpolated UV of every fragment.
    PerFragment,
}

#[derive(Debug, Clone)]
pub struct ShadingConfig {
    /// Fraction of the base color always present regardless of lights.
    pub ambient_strength: f32,
    pub specular: bool,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            ambient_strength: 0.1,
            specular: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShadowConfig {
    /// Global switch; lights still need `casts_shadows`.
    pub enabled: bool,
    /// Depth offset subtracted before the shadow comparison.
    pub bias: f32,
    /// How much of a shadowed light's contribution is removed (0..=1).
    pub strength: f32,
    /// Percentage-closer filtering over 8 samples.
    pub pcf: bool,
    /// Side length in texels of newly created shadow maps.
    pub map_size: u32,
    /// Half side of the orthographic volume for directional and sun lights.
    pub ortho_extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bias: 0.003,
            strength: 0.7,
            pcf: true,
            map_size: 1024,
            ortho_extent: 20.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SsaoConfig {
    pub enabled: bool,
    /// Hemisphere samples per pixel.
    pub kernel_size: usize,
    /// World-space sampling radius.
    pub radius: f32,
    pub bias: f32,
    /// Side of the tiled rotation noise texture.
    pub noise_size: usize,
    /// Box blur radius in pixels; 0 disables the blur.
    pub blur_radius: usize,
    /// Seed for the kernel and noise, fixed for reproducible frames.
    pub seed: u64,
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kernel_size: 16,
            radius: 0.5,
            bias: 0.025,
            noise_size: 4,
            blur_radius: 2,
            seed: 0x55A0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Rasterization worker count.
    pub workers: usize,
    pub strategy: FramebufferStrategy,
    pub backface_culling: bool,
    pub clear_color: Color,
    pub texture_mode: TextureMode,
    pub shading: ShadingConfig,
    pub shadow: ShadowConfig,
    pub ssao: SsaoConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            strategy: FramebufferStrategy::default(),
            backface_culling: true,
            clear_color: Color::BLACK,
            texture_mode: TextureMode::default(),
            shading: ShadingConfig::default(),
            shadow: ShadowConfig::default(),
            ssao: SsaoConfig::default(),
        }
    }
}

/// Number of available cores, or 1 when it cannot be queried.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|err| {
            log::warn!("available_parallelism unavailable ({err}), using one worker");
            1
        })
}

fn check(ok: bool, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(RenderError::InvalidConfig(message()))
    }
}

fn unit_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.workers > 0, || "workers must be at least 1".into())?;

        let shading = &self.shading;
        check(unit_range(shading.ambient_strength), || {
            format!("ambient_strength {} outside 0..=1", shading.ambient_strength)
        })?;

        let shadow = &self.shadow;
        check(shadow.bias.is_finite() && shadow.bias >= 0.0, || {
            format!("shadow bias {} must be finite and non-negative", shadow.bias)
        })?;
        check(unit_range(shadow.strength), || {
            format!("shadow strength {} outside 0..=1", shadow.strength)
        })?;
        check(shadow.map_size > 0, || "shadow map_size must be positive".into())?;
        check(shadow.ortho_extent > 0.0, || {
            "shadow ortho_extent must be positive".into()
        })?;
        check(shadow.near > 0.0 && shadow.far > shadow.near, || {
            format!("shadow clip range {}..{} is empty", shadow.near, shadow.far)
        })?;

        let ssao = &self.ssao;
        check(ssao.kernel_size > 0, || "ssao kernel_size must be positive".into())?;
        check(ssao.noise_size > 0, || "ssao noise_size must be positive".into())?;
        check(ssao.radius > 0.0, || format!("ssao radius {} must be positive", ssao.radius))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.shadow.bias, 0.003);
        assert_eq!(config.shading.ambient_strength, 0.1);
        assert_eq!(config.shadow.strength, 0.7);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = RenderConfig {
            workers: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn out_of_range_shadow_strength_rejected() {
        let mut config = RenderConfig::default();
        config.shadow.strength = 1.5;
        assert!(config.validate().is_err());
    }
}
