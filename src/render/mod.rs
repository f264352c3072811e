//! Framebuffers, the triangle pipeline and post passes.

pub mod framebuffer;
pub mod rasterizer;
pub mod renderer;
pub mod ssao;

pub use framebuffer::{Fragment, FragmentTarget, FrameBuffers, LocalBuffers, RowLockedTarget};
pub use rasterizer::{draw_triangle, BlinnPhongShader, PixelShader};
pub use renderer::Renderer;
