//! Error type for the rendering pipeline.
//!
//! Only construction, configuration and buffer allocation failures surface
//! here. Degenerate triangles and singular matrices are absorbed where they
//! occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A framebuffer, shadow map or texture was requested with a zero side.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Reserving memory for new buffers failed. Existing buffers are untouched.
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    /// The rasterization worker pool could not be created.
    #[error("worker pool creation failed: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Texture pixel data does not match the declared size.
    #[error("invalid texture: {0}")]
    InvalidTexture(String),

    /// Geometry references vertex data that does not exist.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
