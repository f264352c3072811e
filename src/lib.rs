//! A CPU-only 3D software rendering pipeline.
//!
//! Geometry, lights and a camera go in; a color framebuffer comes out. No GPU
//! API is involved: transforms, frustum culling, near-plane clipping,
//! barycentric rasterization, depth testing, Blinn-Phong shading with shadow
//! maps and optional SSAO all run on the CPU, with rasterization spread over
//! a rayon worker pool.
//!
//! # Quick Start
//!
//! ```no_run
//! use rustshade::prelude::*;
//!
//! # fn main() -> rustshade::Result<()> {
//! let mut scene = Scene::new(640, 360, RenderConfig::default())?;
//! scene
//!     .camera_mut()
//!     .transform_mut()
//!     .set_position(Vec3::new(0.0, 2.0, 6.0))
//!     .look_at(Vec3::ZERO);
//! scene.add_geometry(Geometry::cube("box", 1.0));
//! scene.add_light(Light::sun("sun", Vec3::new(-0.3, -1.0, -0.5)).casting_shadows());
//!
//! scene.render_frame()?;
//! scene.to_image().save("frame.png").ok();
//! # Ok(())
//! # }
//! ```

// Public API - exposed to library consumers
pub mod camera;
pub mod colors;
pub mod config;
pub mod error;
pub mod geometry;
pub mod light;
pub mod logging;
pub mod material;
pub mod math;
pub mod projection;
pub mod scene;
pub mod scheduler;
pub mod shadow;
pub mod texture;
pub mod transform;
pub mod triangle;

// Pipeline internals, public for benches and custom targets
pub mod clipper;
pub mod render;

// Re-export commonly needed types at crate root for convenience
pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use geometry::Geometry;
pub use light::Light;
pub use projection::Projection;
pub use scene::{FrameStats, GeometryId, Scene};
pub use transform::Transform;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use rustshade::prelude::*;
/// ```
pub mod prelude {
    // Scene
    pub use crate::scene::{FrameStats, GeometryId, Scene};

    // Configuration
    pub use crate::config::{
        FramebufferStrategy, RenderConfig, ShadingConfig, ShadowConfig, SsaoConfig, TextureMode,
    };

    // Objects
    pub use crate::camera::Camera;
    pub use crate::geometry::Geometry;
    pub use crate::light::{Light, LightKind};
    pub use crate::material::Material;
    pub use crate::texture::Texture;
    pub use crate::triangle::Triangle;

    // Projection & transform
    pub use crate::projection::Projection;
    pub use crate::transform::Transform;

    // Math
    pub use crate::math::bounds::BoundingBox;
    pub use crate::math::mat3::Mat3;
    pub use crate::math::mat4::Mat4;
    pub use crate::math::vec2::Vec2;
    pub use crate::math::vec3::Vec3;
    pub use crate::math::vec4::Vec4;

    // Output
    pub use crate::colors::Color;
    pub use crate::error::{RenderError, Result};
}

/// Module exposing internals for benchmarking. Not part of the stable API.
pub mod bench {
    pub use crate::clipper::clip_space::ClipSpaceVertex;
    pub use crate::render::framebuffer::{FrameBuffers, LocalBuffers};
    pub use crate::render::rasterizer::edgefunction::{rasterize, ScreenVertex};
    pub use crate::render::rasterizer::{draw_triangle, FlatShader};
}
