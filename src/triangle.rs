//! Index triangles and their per-frame derived data.

use crate::colors::Color;
use crate::config::TextureMode;
use crate::light::Light;
use crate::material::Material;
use crate::math::vec2::Vec2;
use crate::math::vec3::Vec3;

/// Data derived from a triangle's world placement, rebuilt every frame the
/// triangle is drawn.
#[derive(Clone, Debug, Default)]
pub struct TriangleCache {
    /// Unit face normal in world space (counter-clockwise front face).
    pub world_normal: Vec3,
    pub world_centroid: Vec3,
    /// `max(0, N·L)` per scene light, `None` for point lights whose direction
    /// varies across the surface.
    pub light_dots: Vec<Option<f32>>,
    base_color: Option<(TextureMode, Color)>,
}

/// A triangle referencing vertex data in its owning geometry's arenas.
#[derive(Clone, Debug)]
pub struct Triangle {
    pub positions: [u32; 3],
    /// Vertex normal indices; `None` means flat shading with the face normal.
    pub normals: Option<[u32; 3]>,
    pub uvs: Option<[u32; 3]>,
    /// Overrides the geometry material for this triangle.
    pub material: Option<Material>,
    cache: TriangleCache,
}

impl Triangle {
    pub fn new(positions: [u32; 3]) -> Self {
        Self {
            positions,
            normals: None,
            uvs: None,
            material: None,
            cache: TriangleCache::default(),
        }
    }

    pub fn with_normals(mut self, normals: [u32; 3]) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_uvs(mut self, uvs: [u32; 3]) -> Self {
        self.uvs = Some(uvs);
        self.invalidate_color_cache();
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.set_material(Some(material));
        self
    }

    pub fn set_material(&mut self, material: Option<Material>) {
        self.material = material;
        self.invalidate_color_cache();
    }

    /// Whether shading uses the face normal.
    pub fn is_flat(&self) -> bool {
        self.normals.is_none()
    }

    pub fn cache(&self) -> &TriangleCache {
        &self.cache
    }

    /// Forces the base color to be recomputed on next use. Needed after
    /// editing a material or texture in place.
    pub fn invalidate_color_cache(&mut self) {
        self.cache.base_color = None;
    }

    /// Rebuilds the world normal, centroid and per-light dot products.
    pub fn refresh(&mut self, world: [Vec3; 3], lights: &[Light]) {
        let [a, b, c] = world;
        let normal = (b - a).cross(c - a).normalize();
        let centroid = (a + b + c) / 3.0;

        self.cache.world_normal = normal;
        self.cache.world_centroid = centroid;
        self.cache.light_dots.clear();
        self.cache.light_dots.extend(lights.iter().map(|light| {
            light
                .is_uniform()
                .then(|| normal.dot(light.direction_to_light(centroid)).max(0.0))
        }));
    }

    /// Base color before lighting, cached per texture mode.
    ///
    /// In [`TextureMode::PerTriangle`] a textured triangle averages the
    /// texture at its three UVs and tints it by the diffuse color. Otherwise
    /// the material diffuse color is used and texturing happens per fragment.
    pub fn base_color(&mut self, material: &Material, uvs: Option<[Vec2; 3]>, mode: TextureMode) -> Color {
        if let Some((cached_mode, color)) = self.cache.base_color {
            if cached_mode == mode {
                return color;
            }
        }

        let color = match (mode, material.diffuse_texture.as_ref(), uvs) {
            (TextureMode::PerTriangle, Some(texture), Some(uvs)) => {
                let sum = uvs
                    .iter()
                    .map(|&uv| texture.sample(uv).to_vec3())
                    .fold(Vec3::ZERO, |acc, c| acc + c);
                Color::from_vec3(sum / 3.0).modulate(material.diffuse)
            }
            _ => material.diffuse,
        };

        self.cache.base_color = Some((mode, color));
        color
    }

    /// The cached base color, if one has been computed.
    pub fn cached_base_color(&self) -> Option<Color> {
        self.cache.base_color.map(|(_, color)| color)
    }
}
