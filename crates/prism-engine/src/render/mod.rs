//! Rendering pipeline.
//!
//! The pipeline is written against [`GraphicsBackend`] and never touches a
//! graphics API directly. Setup happens once, in order: surface, shader program,
//! geometry, texture. After that [`FrameRenderer::render_frame`] is the only
//! per-frame entry point.
//!
//! Conventions:
//! - matrices are column-major with a `[-w, w]` clip depth range
//! - textures are top-left-origin premultiplied RGBA8
//! - counter-clockwise triangles are front-facing; nothing is culled

pub mod backend;
pub mod config;
pub mod frame;
pub mod geometry;
pub mod shader;
pub mod surface;
pub mod texture;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{FrameStatus, GraphicsBackend};
pub use config::PipelineConfig;
pub use frame::{FrameRenderer, RenderState, TransformState};
pub use geometry::{GeometryData, Vertex};
pub use shader::ShaderProgram;
pub use surface::SurfaceManager;
