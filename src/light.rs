//! Lighting types for the renderer.
//!
//! A [`Light`] is one struct over a closed set of behaviors ([`LightKind`]).
//! Every kind answers the same two questions for the shader: which way is
//! the light from a surface point, and how much of it arrives over a given
//! distance.

use crate::colors::Color;
use crate::config::ShadowConfig;
use crate::error::Result;
use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;
use crate::shadow::{ShadowMap, ShadowProjection};
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel rays along the transform's forward axis. The shadow volume
    /// is anchored at the light's position.
    Directional,
    /// Radiates from its position, falling off as `1 / (1 + k·d²)`.
    Point { attenuation: f32 },
    /// Parallel rays like [`LightKind::Directional`], but the shadow volume
    /// follows the camera so it always covers the visible scene.
    Sun,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    transform: Transform,
    pub color: Color,
    pub intensity: f32,
    /// Only honoured when a shadow map is attached.
    pub casts_shadows: bool,
    shadow_map: Option<ShadowMap>,
}

/// An up vector that is not parallel to `direction`.
fn up_for(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 {
        Vec3::BACK
    } else {
        Vec3::UP
    }
}

impl Light {
    fn with_kind(name: impl Into<String>, kind: LightKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::new(),
            color: Color::WHITE,
            intensity: 1.0,
            casts_shadows: false,
            shadow_map: None,
        }
    }

    /// Directional light shining along `direction`.
    pub fn directional(name: impl Into<String>, direction: Vec3) -> Self {
        let mut light = Self::with_kind(name, LightKind::Directional);
        light.transform.look_along(direction);
        light.transform.update_model_matrix();
        light
    }

    /// Sun shining along `direction`.
    pub fn sun(name: impl Into<String>, direction: Vec3) -> Self {
        let mut light = Self::with_kind(name, LightKind::Sun);
        light.transform.look_along(direction);
        light.transform.update_model_matrix();
        light
    }

    /// Point light at `position`. Its shadow frustum looks straight down.
    pub fn point(name: impl Into<String>, position: Vec3, attenuation: f32) -> Self {
        let mut light = Self::with_kind(name, LightKind::Point { attenuation });
        light.transform.set_position(position).look_along(Vec3::DOWN);
        light.transform.update_model_matrix();
        light
    }

    pub fn with_color(mut self, color: Color, intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity;
        self
    }

    /// Attaches a `size` x `size` shadow map and enables shadow casting.
    pub fn with_shadows(mut self, size: u32) -> Result<Self> {
        self.shadow_map = Some(ShadowMap::new(size, size)?);
        self.casts_shadows = true;
        Ok(self)
    }

    /// Enables shadow casting without a map. The scene attaches one of
    /// [`ShadowConfig::map_size`] texels before the next shadow pass.
    pub fn casting_shadows(mut self) -> Self {
        self.casts_shadows = true;
        self
    }

    /// Allocates a `size` x `size` map for a caster that has none. Returns
    /// whether a map was attached.
    pub fn ensure_shadow_map(&mut self, size: u32) -> Result<bool> {
        if !self.casts_shadows || self.shadow_map.is_some() {
            return Ok(false);
        }
        self.shadow_map = Some(ShadowMap::new(size, size)?);
        Ok(true)
    }

    // ============ Placement ============

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    /// Direction light travels in (directional and sun lights).
    pub fn direction(&self) -> Vec3 {
        self.transform.forward()
    }

    // ============ Shading contract ============

    /// Whether the light direction is the same for every surface point.
    pub fn is_uniform(&self) -> bool {
        !matches!(self.kind, LightKind::Point { .. })
    }

    /// Unit vector from `fragment` toward the light.
    pub fn direction_to_light(&self, fragment: Vec3) -> Vec3 {
        match self.kind {
            LightKind::Directional | LightKind::Sun => -self.direction(),
            LightKind::Point { .. } => (self.position() - fragment).normalize(),
        }
    }

    /// Fraction of the light arriving over `distance`.
    pub fn attenuation(&self, distance: f32) -> f32 {
        match self.kind {
            LightKind::Point { attenuation } => 1.0 / (1.0 + attenuation * distance * distance),
            LightKind::Directional | LightKind::Sun => 1.0,
        }
    }

    /// Radiance multiplier per channel in 0..=1 space, before attenuation.
    pub fn radiance(&self) -> Vec3 {
        self.color.to_unit_vec3() * self.intensity
    }

    // ============ Shadows ============

    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref()
    }

    /// The map to test against this frame, if the light casts shadows.
    pub fn active_shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref().filter(|_| self.casts_shadows)
    }

    pub fn remove_shadow_map(&mut self) -> Option<ShadowMap> {
        self.casts_shadows = false;
        self.shadow_map.take()
    }

    /// Resolves the transform and rebuilds the shadow matrices.
    ///
    /// `focus` is the point a sun's shadow volume is centred on.
    pub fn update(&mut self, shadow: &ShadowConfig, focus: Vec3) {
        self.transform.update_model_matrix();
        if !self.casts_shadows {
            return;
        }

        let forward = self.direction();
        let (view, projection, kind) = match self.kind {
            LightKind::Directional => {
                let eye = self.position();
                (
                    Mat4::look_at_rh(eye, eye + forward, up_for(forward)),
                    ortho_volume(shadow),
                    ShadowProjection::Orthographic,
                )
            }
            LightKind::Sun => {
                // Back off so the whole depth range is centred on the focus.
                let eye = focus - forward * (shadow.near + shadow.far) * 0.5;
                (
                    Mat4::look_at_rh(eye, focus, up_for(forward)),
                    ortho_volume(shadow),
                    ShadowProjection::Orthographic,
                )
            }
            LightKind::Point { .. } => {
                let eye = self.position();
                (
                    Mat4::look_at_rh(eye, eye + forward, up_for(forward)),
                    Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, shadow.near, shadow.far),
                    ShadowProjection::Perspective,
                )
            }
        };

        if let Some(map) = self.shadow_map.as_mut() {
            map.set_matrices(view, projection, kind);
        }
    }
}

fn ortho_volume(shadow: &ShadowConfig) -> Mat4 {
    let e = shadow.ortho_extent;
    Mat4::orthographic_rh(-e, e, -e, e, shadow.near, shadow.far)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn directional_light_points_back_along_its_direction() {
        let light = Light::directional("key", Vec3::new(0.0, -1.0, 0.0));
        let l = light.direction_to_light(Vec3::new(5.0, 0.0, -3.0));
        assert_relative_eq!(l.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(l.x, 0.0, epsilon = 1e-5);
        assert!(light.is_uniform());
    }

    #[test]
    fn angled_illumination() {
        // Light straight down onto a 45 degree normal.
        let light = Light::directional("key", Vec3::DOWN);
        let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        let intensity = normal.dot(light.direction_to_light(Vec3::ZERO)).max(0.0);
        assert_relative_eq!(intensity, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
    }

    #[test]
    fn point_light_radiates_from_position() {
        let light = Light::point("bulb", Vec3::new(0.0, 4.0, 0.0), 0.5);
        let l = light.direction_to_light(Vec3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(l.y, 1.0, epsilon = 1e-6);
        assert!(!light.is_uniform());
    }

    #[test]
    fn point_attenuation_limits() {
        let light = Light::point("bulb", Vec3::ZERO, 0.25);
        assert_relative_eq!(light.attenuation(0.0), 1.0);
        assert_relative_eq!(light.attenuation(2.0), 0.5);
        assert!(light.attenuation(1.0e4) < 1.0e-6);

        let sun = Light::sun("sun", Vec3::DOWN);
        assert_relative_eq!(sun.attenuation(1.0e4), 1.0);
    }

    #[test]
    fn shadow_map_only_active_when_casting() {
        let mut light = Light::directional("key", Vec3::DOWN).with_shadows(16).unwrap();
        assert!(light.active_shadow_map().is_some());
        light.casts_shadows = false;
        assert!(light.active_shadow_map().is_none());
        assert!(light.shadow_map().is_some());
    }

    #[test]
    fn shadow_map_is_allocated_only_for_casters_without_one() {
        let mut plain = Light::point("bulb", Vec3::ZERO, 0.1);
        assert!(!plain.ensure_shadow_map(32).unwrap());
        assert!(plain.shadow_map().is_none());

        let mut caster = Light::sun("sun", Vec3::DOWN).casting_shadows();
        assert!(caster.ensure_shadow_map(32).unwrap());
        assert_eq!(caster.shadow_map().map(|m| (m.width(), m.height())), Some((32, 32)));
        assert!(!caster.ensure_shadow_map(64).unwrap());
        assert_eq!(caster.shadow_map().map(|m| m.width()), Some(32));

        let mut broken = Light::sun("sun", Vec3::DOWN).casting_shadows();
        assert!(broken.ensure_shadow_map(0).is_err());
    }

    #[test]
    fn update_picks_projection_per_kind() {
        let config = ShadowConfig::default();
        let mut sun = Light::sun("sun", Vec3::DOWN).with_shadows(8).unwrap();
        sun.update(&config, Vec3::ZERO);
        assert_eq!(
            sun.shadow_map().map(|m| m.projection_kind()),
            Some(ShadowProjection::Orthographic)
        );

        let mut bulb = Light::point("bulb", Vec3::new(0.0, 5.0, 0.0), 0.1)
            .with_shadows(8)
            .unwrap();
        bulb.update(&config, Vec3::ZERO);
        assert_eq!(
            bulb.shadow_map().map(|m| m.projection_kind()),
            Some(ShadowProjection::Perspective)
        );
    }
}
