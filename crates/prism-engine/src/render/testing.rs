//! In-memory [`GraphicsBackend`] that records every call, for unit tests.

use std::io::Cursor;

use crate::assets::MemoryAssets;
use crate::coords::PixelSize;
use crate::error::SetupError;
use crate::math::Mat4;
use crate::paint::Color;
use crate::time::WallClock;

use super::backend::{
    BufferHandle, BufferUsage, FilterMode, FrameStatus, GraphicsBackend, ProgramHandle,
    TargetsHandle, TextureHandle, TextureImage, UniformLocation, VertexAttribute, VertexLayout,
};
use super::shader::LinkedProgram;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MakeCurrent,
    CreateTargets { handle: TargetsHandle, size: PixelSize, depth: bool },
    DeleteTargets(TargetsHandle),
    CreateProgram { handle: ProgramHandle, attributes: usize, depth_test: bool },
    UseProgram(ProgramHandle),
    CreateBuffer { handle: BufferHandle, usage: BufferUsage, len: usize },
    CreateTexture { handle: TextureHandle, width: u32, height: u32, min_filter: FilterMode },
    DeleteTexture(TextureHandle),
    Clear { targets: TargetsHandle, color: Color, depth: bool },
    EnableDepthTest,
    SetUniform { location: UniformLocation, value: Mat4 },
    SetViewport(PixelSize),
    BindAttribute { buffer: BufferHandle, stride: u64, attribute: VertexAttribute },
    BindTexture { unit: u32, texture: TextureHandle, sampler: UniformLocation },
    DrawIndexed { indices: BufferHandle, count: u32 },
    Present(TargetsHandle),
}

impl Call {
    /// Short name of the call, for ordering assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Call::MakeCurrent => "make_current",
            Call::CreateTargets { .. } => "create_targets",
            Call::DeleteTargets(_) => "delete_targets",
            Call::CreateProgram { .. } => "create_program",
            Call::UseProgram(_) => "use_program",
            Call::CreateBuffer { .. } => "create_buffer",
            Call::CreateTexture { .. } => "create_texture",
            Call::DeleteTexture(_) => "delete_texture",
            Call::Clear { .. } => "clear",
            Call::EnableDepthTest => "enable_depth_test",
            Call::SetUniform { .. } => "set_uniform",
            Call::SetViewport(_) => "set_viewport",
            Call::BindAttribute { .. } => "bind_attribute",
            Call::BindTexture { .. } => "bind_texture",
            Call::DrawIndexed { .. } => "draw_indexed",
            Call::Present(_) => "present",
        }
    }
}

#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    next_handle: u32,
    pub size: PixelSize,
    pub fail_make_current: bool,
    pub fail_allocation: bool,
    pub present_status: FrameStatus,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::with_size(PixelSize::new(800, 600))
    }
}

impl RecordingBackend {
    pub fn with_size(size: PixelSize) -> Self {
        Self {
            calls: Vec::new(),
            next_handle: 1,
            size,
            fail_make_current: false,
            fail_allocation: false,
            present_status: FrameStatus::Presented,
        }
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn next(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn allocate(&mut self, what: &'static str) -> Result<u32, SetupError> {
        if self.fail_allocation {
            return Err(SetupError::Allocation {
                what,
                reason: "recording backend configured to fail".to_string(),
            });
        }
        Ok(self.next())
    }
}

impl GraphicsBackend for RecordingBackend {
    fn make_current(&mut self) -> Result<(), SetupError> {
        if self.fail_make_current {
            return Err(SetupError::Context("no context on this thread".to_string()));
        }
        self.calls.push(Call::MakeCurrent);
        Ok(())
    }

    fn surface_size(&self) -> PixelSize {
        self.size
    }

    fn create_targets(&mut self, size: PixelSize, depth: bool) -> Result<TargetsHandle, SetupError> {
        let handle = TargetsHandle(self.allocate("backbuffers")?);
        self.calls.push(Call::CreateTargets { handle, size, depth });
        Ok(handle)
    }

    fn delete_targets(&mut self, targets: TargetsHandle) {
        self.calls.push(Call::DeleteTargets(targets));
    }

    fn create_program(
        &mut self,
        _program: &LinkedProgram,
        layout: &VertexLayout,
        depth_test: bool,
    ) -> Result<ProgramHandle, SetupError> {
        let handle = ProgramHandle(self.allocate("program")?);
        self.calls.push(Call::CreateProgram {
            handle,
            attributes: layout.attributes.len(),
            depth_test,
        });
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(Call::UseProgram(program));
    }

    fn create_static_buffer(&mut self, usage: BufferUsage, contents: &[u8]) -> Result<BufferHandle, SetupError> {
        let handle = BufferHandle(self.allocate("buffer")?);
        self.calls.push(Call::CreateBuffer {
            handle,
            usage,
            len: contents.len(),
        });
        Ok(handle)
    }

    fn create_texture(&mut self, image: &TextureImage<'_>) -> Result<TextureHandle, SetupError> {
        let handle = TextureHandle(self.allocate("texture")?);
        self.calls.push(Call::CreateTexture {
            handle,
            width: image.width,
            height: image.height,
            min_filter: image.min_filter,
        });
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn clear(&mut self, targets: TargetsHandle, color: Color, clear_depth: bool) {
        self.calls.push(Call::Clear {
            targets,
            color,
            depth: clear_depth,
        });
    }

    fn enable_depth_test(&mut self) {
        self.calls.push(Call::EnableDepthTest);
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.calls.push(Call::SetUniform {
            location,
            value: *value,
        });
    }

    fn set_viewport(&mut self, size: PixelSize) {
        self.calls.push(Call::SetViewport(size));
    }

    fn bind_vertex_attribute(&mut self, buffer: BufferHandle, stride: u64, attribute: &VertexAttribute) {
        self.calls.push(Call::BindAttribute {
            buffer,
            stride,
            attribute: *attribute,
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle, sampler: UniformLocation) {
        self.calls.push(Call::BindTexture { unit, texture, sampler });
    }

    fn draw_indexed(&mut self, indices: BufferHandle, index_count: u32) {
        self.calls.push(Call::DrawIndexed {
            indices,
            count: index_count,
        });
    }

    fn present(&mut self, targets: TargetsHandle) -> FrameStatus {
        self.calls.push(Call::Present(targets));
        self.present_status
    }
}

/// Wall clock frozen at a fixed reading.
pub struct FixedClock(pub f64);

impl WallClock for FixedClock {
    fn now_seconds(&self) -> f64 {
        self.0
    }
}

/// Solid-color PNG encoded in memory.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("in-memory png encode");
    out.into_inner()
}

/// The bundled shader pairs plus a small generated floor texture.
pub fn bundled_assets() -> MemoryAssets {
    MemoryAssets::new()
        .with(
            "shaders/TexturedVertex.wgsl",
            include_str!("../../../../assets/shaders/TexturedVertex.wgsl"),
        )
        .with(
            "shaders/TexturedFragment.wgsl",
            include_str!("../../../../assets/shaders/TexturedFragment.wgsl"),
        )
        .with(
            "shaders/SimpleVertex.wgsl",
            include_str!("../../../../assets/shaders/SimpleVertex.wgsl"),
        )
        .with(
            "shaders/SimpleFragment.wgsl",
            include_str!("../../../../assets/shaders/SimpleFragment.wgsl"),
        )
        .with("textures/tile_floor.png", png(4, 4, [200, 180, 150, 255]))
}
