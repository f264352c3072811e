//! Surface description used by the shader.

use crate::colors::Color;
use crate::texture::SharedTexture;

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub diffuse: Color,
    pub specular: Color,
    /// Blinn-Phong exponent.
    pub shininess: f32,
    pub diffuse_texture: Option<SharedTexture>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Material {
    /// Neutral grey, no specular, shininess 32.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: Color::GREY,
            specular: Color::BLACK,
            shininess: 32.0,
            diffuse_texture: None,
        }
    }

    pub fn with_diffuse(mut self, diffuse: Color) -> Self {
        self.diffuse = diffuse;
        self
    }

    pub fn with_specular(mut self, specular: Color, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn with_texture(mut self, texture: SharedTexture) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }
}
