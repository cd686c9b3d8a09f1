//! Graphics-API seam of the pipeline.
//!
//! The pipeline speaks to the GPU through [`GraphicsBackend`], an immediate-mode
//! contract shaped after a classic "bind state, then draw" API. Resources are
//! named by small copyable handles that the backend owns, so the pipeline never
//! holds API objects with borrowed lifetimes.
//!
//! All calls must happen on the thread that owns the backend's context.

use crate::coords::PixelSize;
use crate::error::SetupError;
use crate::math::Mat4;
use crate::paint::Color;

use super::shader::LinkedProgram;

/// Backend-assigned name of a render target (color + optional depth backbuffer).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TargetsHandle(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Shader input slot of a per-vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeLocation(pub u32);

/// Binding slot of a uniform resource (matrix, texture or sampler).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

impl UniformLocation {
    pub const fn new(group: u32, binding: u32) -> Self {
        Self { group, binding }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

/// One attribute pointer: where a shader input reads from inside a vertex.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: AttributeLocation,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Interleaved vertex layout shared by every vertex of a draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    /// Contents are `u8` indices.
    Index,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Decoded pixels handed to [`GraphicsBackend::create_texture`].
///
/// `pixels` is top-left-origin, premultiplied RGBA8, `width * height * 4` bytes.
#[derive(Debug, Copy, Clone)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

/// Result of presenting a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    /// The frame reached the host surface.
    Presented,
    /// Transient surface condition; the frame was dropped and the next one may succeed.
    Dropped,
    /// The surface is gone for good (commonly out of memory). The host should stop.
    SurfaceLost,
}

/// Immediate-mode graphics contract consumed by the pipeline.
///
/// Setup calls are fallible and every failure is a fatal [`SetupError`].
/// Per-frame calls are infallible; surface trouble is reported once, by
/// [`present`](Self::present).
pub trait GraphicsBackend {
    /// Makes this backend's context current on the calling thread.
    fn make_current(&mut self) -> Result<(), SetupError>;

    /// Current pixel size of the host drawable.
    fn surface_size(&self) -> PixelSize;

    /// Allocates a color backbuffer bound to the host drawable and, when
    /// `depth` is set, a depth backbuffer of the same size.
    fn create_targets(&mut self, size: PixelSize, depth: bool) -> Result<TargetsHandle, SetupError>;

    fn delete_targets(&mut self, targets: TargetsHandle);

    /// Creates the GPU program for an already compiled and linked shader pair.
    fn create_program(
        &mut self,
        program: &LinkedProgram,
        layout: &VertexLayout,
        depth_test: bool,
    ) -> Result<ProgramHandle, SetupError>;

    /// Makes `program` the one subsequent uniform uploads and draws use.
    fn use_program(&mut self, program: ProgramHandle);

    /// Uploads immutable buffer contents once.
    fn create_static_buffer(
        &mut self,
        usage: BufferUsage,
        contents: &[u8],
    ) -> Result<BufferHandle, SetupError>;

    fn create_texture(&mut self, image: &TextureImage<'_>) -> Result<TextureHandle, SetupError>;

    fn delete_texture(&mut self, texture: TextureHandle);

    // ── per frame ─────────────────────────────────────────────────────────

    fn clear(&mut self, targets: TargetsHandle, color: Color, clear_depth: bool);

    fn enable_depth_test(&mut self);

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    fn set_viewport(&mut self, size: PixelSize);

    fn bind_vertex_attribute(&mut self, buffer: BufferHandle, stride: u64, attribute: &VertexAttribute);

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle, sampler: UniformLocation);

    /// Draws `index_count` indices from `indices` as a triangle list.
    fn draw_indexed(&mut self, indices: BufferHandle, index_count: u32);

    fn present(&mut self, targets: TargetsHandle) -> FrameStatus;
}
