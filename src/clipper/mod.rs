//! Polygon clipping in homogeneous clip space.
//!
//! Triangles are clipped against the near plane only, before the perspective
//! divide. The side planes are handled by the viewport clamp in the
//! rasterizer and the far plane by its depth range check.

pub mod clip_space;

pub use clip_space::{clip_near, near_distance, ClipSpacePolygon, ClipSpaceVertex};
