use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::PixelSize;
use crate::error::SetupError;
use crate::math::Mat4;
use crate::paint::Color;
use crate::render::backend::{
    BufferHandle, BufferUsage, FilterMode, FrameStatus, GraphicsBackend, ProgramHandle,
    TargetsHandle, TextureHandle, TextureImage, UniformLocation, VertexAttribute, VertexFormat,
    VertexLayout,
};
use crate::render::shader::{LinkedProgram, ResourceKind, ShaderResource};

use super::{Gpu, GpuFrame};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth16Unorm;
const MAT4_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;

/// [`GraphicsBackend`] on top of wgpu.
///
/// The immediate-mode calls are folded into wgpu's model: `clear` acquires the
/// swapchain image, binds record state, `draw_indexed` encodes one render pass
/// and `present` submits. Depth testing is baked into each pipeline at
/// `create_program`.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    window: &'w Window,

    targets: Slots<TargetsHandle, TargetSlot>,
    programs: Slots<ProgramHandle, ProgramSlot>,
    buffers: Slots<BufferHandle, BufferSlot>,
    textures: Slots<TextureHandle, TextureSlot>,

    current: Option<ProgramHandle>,
    frame: Option<FrameState>,

    /// Status of a frame whose acquisition already failed.
    failed: Option<FrameStatus>,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>, window: &'w Window) -> Self {
        Self {
            gpu,
            window,
            targets: Slots::default(),
            programs: Slots::default(),
            buffers: Slots::default(),
            textures: Slots::default(),
            current: None,
            frame: None,
            failed: None,
        }
    }

    fn check_texture_size(&self, what: &'static str, width: u32, height: u32) -> Result<(), SetupError> {
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(SetupError::Allocation {
                what,
                reason: format!("{width}x{height} is outside 1..={max}"),
            });
        }
        Ok(())
    }

    fn current_program(&mut self) -> Option<&mut ProgramSlot> {
        let handle = self.current?;
        self.programs.get_mut(handle)
    }
}

impl GraphicsBackend for WgpuBackend<'_> {
    fn make_current(&mut self) -> Result<(), SetupError> {
        // A wgpu device is not bound to a thread; there is nothing to switch.
        Ok(())
    }

    fn surface_size(&self) -> PixelSize {
        self.window.inner_size().into()
    }

    fn create_targets(&mut self, size: PixelSize, depth: bool) -> Result<TargetsHandle, SetupError> {
        self.check_texture_size("backbuffers", size.width, size.height)?;

        self.gpu.resize(PhysicalSize::new(size.width, size.height));

        let depth = depth.then(|| {
            self.gpu
                .device()
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("prism depth buffer"),
                    size: wgpu::Extent3d {
                        width: size.width,
                        height: size.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: DEPTH_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        Ok(self.targets.insert(TargetSlot { size, depth }))
    }

    fn delete_targets(&mut self, targets: TargetsHandle) {
        self.targets.remove(targets);
    }

    fn create_program(
        &mut self,
        program: &LinkedProgram,
        layout: &VertexLayout,
        depth_test: bool,
    ) -> Result<ProgramHandle, SetupError> {
        let device = self.gpu.device();

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism vertex stage"),
            source: wgpu::ShaderSource::Wgsl(program.vertex().source().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism fragment stage"),
            source: wgpu::ShaderSource::Wgsl(program.fragment().source().into()),
        });

        let resources = program.resources().to_vec();
        let group_layouts: Vec<wgpu::BindGroupLayout> = (0..group_count(&resources))
            .map(|group| {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = resources
                    .iter()
                    .filter(|r| r.location.group == group)
                    .filter_map(layout_entry)
                    .collect();
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("prism bind group layout"),
                    entries: &entries,
                })
            })
            .collect();
        let group_layout_refs: Vec<&wgpu::BindGroupLayout> = group_layouts.iter().collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("prism pipeline layout"),
            bind_group_layouts: &group_layout_refs,
            immediate_size: 0,
        });

        let attributes: Vec<wgpu::VertexAttribute> = layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: vertex_format(a.format),
                offset: a.offset,
                shader_location: a.location.0,
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("prism pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(program.vertex().entry_point()),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: layout.stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },

            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(program.fragment().entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gpu.surface_format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: depth_test.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        let uniforms = resources
            .iter()
            .filter(|r| r.kind == ResourceKind::Matrix4)
            .map(|r| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("prism matrix ubo"),
                    contents: Mat4::IDENTITY.as_bytes(),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                (r.location, buffer)
            })
            .collect();

        let slot = ProgramSlot {
            pipeline,
            group_layouts,
            resources,
            uniforms,
            stride: layout.stride,
            depth_test,
            texture: None,
            bind_groups: None,
        };
        Ok(self.programs.insert(slot))
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if self.programs.get(program).is_none() {
            log::warn!("use_program: unknown program {}", program.0);
            return;
        }
        self.current = Some(program);
    }

    fn create_static_buffer(&mut self, usage: BufferUsage, contents: &[u8]) -> Result<BufferHandle, SetupError> {
        let max = self.gpu.device().limits().max_buffer_size;
        let (label, bytes, wgpu_usage, elements) = match usage {
            BufferUsage::Vertex => (
                "prism vertex buffer",
                contents.to_vec(),
                wgpu::BufferUsages::VERTEX,
                contents.len() as u32,
            ),
            BufferUsage::Index => {
                let wide = widen_indices(contents);
                (
                    "prism index buffer",
                    bytemuck::cast_slice::<u16, u8>(&wide).to_vec(),
                    wgpu::BufferUsages::INDEX,
                    wide.len() as u32,
                )
            }
        };

        if bytes.len() as u64 > max {
            return Err(SetupError::Allocation {
                what: label,
                reason: format!("{} bytes exceeds the device limit of {max}", bytes.len()),
            });
        }

        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &bytes,
                usage: wgpu_usage,
            });

        Ok(self.buffers.insert(BufferSlot { buffer, elements }))
    }

    fn create_texture(&mut self, image: &TextureImage<'_>) -> Result<TextureHandle, SetupError> {
        self.check_texture_size("texture", image.width, image.height)?;

        let expected = image.width as usize * image.height as usize * 4;
        if image.pixels.len() != expected {
            return Err(SetupError::Allocation {
                what: "texture",
                reason: format!("expected {expected} bytes of RGBA8, got {}", image.pixels.len()),
            });
        }

        let device = self.gpu.device();
        let extent = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("prism texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            extent,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prism texture sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: filter_mode(image.mag_filter),
            min_filter: filter_mode(image.min_filter),
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(self.textures.insert(TextureSlot {
            _texture: texture,
            view,
            sampler,
        }))
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(texture);
        for program in self.programs.iter_mut() {
            if program.texture == Some(texture) {
                program.texture = None;
                program.bind_groups = None;
            }
        }
    }

    fn clear(&mut self, targets: TargetsHandle, color: Color, clear_depth: bool) {
        if self.frame.take().is_some() {
            log::warn!("clear: previous frame was never presented; discarding it");
        }
        self.failed = None;

        match self.gpu.begin_frame() {
            Ok(gpu_frame) => {
                self.frame = Some(FrameState {
                    gpu_frame,
                    targets,
                    clear_color: Some(wgpu::Color {
                        r: color.r as f64,
                        g: color.g as f64,
                        b: color.b as f64,
                        a: color.a as f64,
                    }),
                    clear_depth,
                    depth_test: false,
                    viewport: None,
                    vertex_buffer: None,
                });
            }
            Err(err) => {
                log::debug!("surface acquire failed: {err:?}");
                let action = self.gpu.handle_surface_error(err);
                self.failed = Some(action.frame_status());
            }
        }
    }

    fn enable_depth_test(&mut self) {
        if let Some(frame) = self.frame.as_mut() {
            frame.depth_test = true;
        }
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        let Some(handle) = self.current else {
            log::warn!("set_uniform_mat4: no program in use");
            return;
        };
        let Some(buffer) = self
            .programs
            .get(handle)
            .and_then(|p| p.uniforms.get(&location))
        else {
            log::warn!("set_uniform_mat4: no matrix at {location:?}");
            return;
        };
        self.gpu.queue().write_buffer(buffer, 0, value.as_bytes());
    }

    fn set_viewport(&mut self, size: PixelSize) {
        if let Some(frame) = self.frame.as_mut() {
            frame.viewport = Some(size);
        }
    }

    fn bind_vertex_attribute(&mut self, buffer: BufferHandle, stride: u64, attribute: &VertexAttribute) {
        if let Some(program) = self.current_program() {
            if program.stride != stride {
                log::warn!(
                    "attribute {:?} bound with stride {stride}, program expects {}",
                    attribute.location,
                    program.stride
                );
            }
        }
        if let Some(frame) = self.frame.as_mut() {
            frame.vertex_buffer = Some(buffer);
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle, sampler: UniformLocation) {
        if unit != 0 {
            log::warn!("bind_texture: only texture unit 0 is supported (got {unit})");
            return;
        }
        let Some(program) = self.current_program() else {
            log::warn!("bind_texture: no program in use");
            return;
        };
        let declared = program
            .resources
            .iter()
            .any(|r| r.location == sampler && r.kind == ResourceKind::Texture);
        if !declared {
            log::warn!("bind_texture: program has no texture at {sampler:?}");
            return;
        }
        if program.texture != Some(texture) {
            program.texture = Some(texture);
            program.bind_groups = None;
        }
    }

    fn draw_indexed(&mut self, indices: BufferHandle, index_count: u32) {
        let Some(handle) = self.current else {
            log::warn!("draw_indexed: no program in use");
            return;
        };

        let device = self.gpu.device();

        let Some(program) = self.programs.get_mut(handle) else {
            return;
        };
        if program.bind_groups.is_none() {
            program.bind_groups = build_bind_groups(device, program, &self.textures);
        }

        let Some(frame) = self.frame.as_mut() else {
            // Acquisition failed; `present` reports it.
            return;
        };

        if program.depth_test && !frame.depth_test {
            log::warn!("draw_indexed: depth program drawn without enable_depth_test");
        }

        let Some(bind_groups) = program.bind_groups.as_ref() else {
            log::warn!("draw_indexed: program resources are not fully bound");
            return;
        };
        let Some(vertices) = frame.vertex_buffer.and_then(|h| self.buffers.get(h)) else {
            log::warn!("draw_indexed: no vertex buffer bound");
            return;
        };
        let Some(index_slot) = self.buffers.get(indices) else {
            log::warn!("draw_indexed: unknown index buffer {}", indices.0);
            return;
        };

        let Some(target) = self.targets.get(frame.targets) else {
            log::warn!("draw_indexed: unknown targets {}", frame.targets.0);
            return;
        };
        let depth_view = match (program.depth_test, target.depth.as_ref()) {
            (false, _) => None,
            (true, Some(view)) => Some(view),
            (true, None) => {
                log::warn!("draw_indexed: depth program but targets have no depth buffer");
                return;
            }
        };

        let color_load = match frame.clear_color.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = if std::mem::take(&mut frame.clear_depth) {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };

        let mut rpass = frame
            .gpu_frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.gpu_frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: depth_view.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

        // wgpu rejects viewports larger than the attachment.
        let viewport = frame.viewport.unwrap_or(target.size);
        let (w, h) = (
            viewport.width.min(target.size.width).max(1),
            viewport.height.min(target.size.height).max(1),
        );
        rpass.set_viewport(0.0, 0.0, w as f32, h as f32, 0.0, 1.0);

        rpass.set_pipeline(&program.pipeline);
        for (group, bind_group) in bind_groups.iter().enumerate() {
            rpass.set_bind_group(group as u32, bind_group, &[]);
        }
        rpass.set_vertex_buffer(0, vertices.buffer.slice(..));
        rpass.set_index_buffer(index_slot.buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..index_count.min(index_slot.elements), 0, 0..1);
    }

    fn present(&mut self, targets: TargetsHandle) -> FrameStatus {
        if let Some(status) = self.failed.take() {
            return status;
        }
        let Some(mut frame) = self.frame.take() else {
            log::warn!("present: no frame in flight");
            return FrameStatus::Dropped;
        };
        if frame.targets != targets {
            log::warn!("present: targets {} differ from the cleared ones", targets.0);
        }

        // Nothing was drawn; still honor the clear.
        if let Some(color) = frame.clear_color.take() {
            let _ = frame
                .gpu_frame
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("prism clear pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.gpu_frame.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(color),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
        }

        self.gpu.submit(frame.gpu_frame, self.window);
        FrameStatus::Presented
    }
}

// ── resource slots ────────────────────────────────────────────────────────

/// Handle types that index a [`Slots`] table.
trait SlotHandle: Copy {
    fn from_index(index: u32) -> Self;
    fn index(self) -> u32;
}

macro_rules! slot_handle {
    ($($handle:ident),*) => {
        $(impl SlotHandle for $handle {
            fn from_index(index: u32) -> Self {
                $handle(index)
            }

            fn index(self) -> u32 {
                self.0
            }
        })*
    };
}

slot_handle!(TargetsHandle, ProgramHandle, BufferHandle, TextureHandle);

/// Handle-indexed storage. Removed slots are never reused, so a stale handle
/// can never alias a newer resource.
struct Slots<H, T> {
    items: Vec<Option<T>>,
    handle: PhantomData<H>,
}

impl<H, T> Default for Slots<H, T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            handle: PhantomData,
        }
    }
}

impl<H: SlotHandle, T> Slots<H, T> {
    fn insert(&mut self, item: T) -> H {
        self.items.push(Some(item));
        H::from_index((self.items.len() - 1) as u32)
    }

    fn get(&self, handle: H) -> Option<&T> {
        self.items.get(handle.index() as usize)?.as_ref()
    }

    fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.items.get_mut(handle.index() as usize)?.as_mut()
    }

    fn remove(&mut self, handle: H) -> Option<T> {
        self.items.get_mut(handle.index() as usize)?.take()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut().flatten()
    }
}

struct TargetSlot {
    size: PixelSize,
    depth: Option<wgpu::TextureView>,
}

struct ProgramSlot {
    pipeline: wgpu::RenderPipeline,
    group_layouts: Vec<wgpu::BindGroupLayout>,
    resources: Vec<ShaderResource>,
    uniforms: BTreeMap<UniformLocation, wgpu::Buffer>,
    stride: u64,
    depth_test: bool,
    texture: Option<TextureHandle>,
    /// One bind group per group index; rebuilt when the bound texture changes.
    bind_groups: Option<Vec<wgpu::BindGroup>>,
}

struct BufferSlot {
    buffer: wgpu::Buffer,
    /// Vertex buffers: bytes. Index buffers: index count.
    elements: u32,
}

struct TextureSlot {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

struct FrameState {
    gpu_frame: GpuFrame,
    targets: TargetsHandle,
    /// Pending color clear; consumed by the first pass of the frame.
    clear_color: Option<wgpu::Color>,
    clear_depth: bool,
    depth_test: bool,
    viewport: Option<PixelSize>,
    vertex_buffer: Option<BufferHandle>,
}

// ── translation helpers ───────────────────────────────────────────────────

/// wgpu has no 8-bit index format.
fn widen_indices(indices: &[u8]) -> Vec<u16> {
    indices.iter().map(|&i| u16::from(i)).collect()
}

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn group_count(resources: &[ShaderResource]) -> u32 {
    resources
        .iter()
        .map(|r| r.location.group + 1)
        .max()
        .unwrap_or(0)
}

fn visibility(resource: &ShaderResource) -> wgpu::ShaderStages {
    let mut stages = wgpu::ShaderStages::NONE;
    if resource.vertex_visible {
        stages |= wgpu::ShaderStages::VERTEX;
    }
    if resource.fragment_visible {
        stages |= wgpu::ShaderStages::FRAGMENT;
    }
    stages
}

fn layout_entry(resource: &ShaderResource) -> Option<wgpu::BindGroupLayoutEntry> {
    let ty = match resource.kind {
        ResourceKind::Matrix4 => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(MAT4_SIZE),
        },
        ResourceKind::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        ResourceKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        ResourceKind::Unsupported => return None,
    };

    Some(wgpu::BindGroupLayoutEntry {
        binding: resource.location.binding,
        visibility: visibility(resource),
        ty,
        count: None,
    })
}

/// Builds every bind group of `program`. `None` while a texture the program
/// samples is not bound yet.
fn build_bind_groups(
    device: &wgpu::Device,
    program: &ProgramSlot,
    textures: &Slots<TextureHandle, TextureSlot>,
) -> Option<Vec<wgpu::BindGroup>> {
    let texture = program.texture.and_then(|h| textures.get(h));

    program
        .group_layouts
        .iter()
        .enumerate()
        .map(|(group, layout)| {
            let mut entries = Vec::new();
            for resource in program
                .resources
                .iter()
                .filter(|r| r.location.group == group as u32)
            {
                let binding = match resource.kind {
                    ResourceKind::Matrix4 => program.uniforms.get(&resource.location)?.as_entire_binding(),
                    ResourceKind::Texture => wgpu::BindingResource::TextureView(&texture?.view),
                    ResourceKind::Sampler => wgpu::BindingResource::Sampler(&texture?.sampler),
                    ResourceKind::Unsupported => continue,
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: resource.location.binding,
                    resource: binding,
                });
            }

            Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("prism bind group"),
                layout,
                entries: &entries,
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, group: u32, binding: u32, kind: ResourceKind) -> ShaderResource {
        ShaderResource {
            name: name.to_string(),
            location: UniformLocation::new(group, binding),
            kind,
            vertex_visible: kind == ResourceKind::Matrix4,
            fragment_visible: kind != ResourceKind::Matrix4,
        }
    }

    #[test]
    fn indices_are_widened_without_reordering() {
        assert_eq!(widen_indices(&[0, 1, 2, 255]), vec![0u16, 1, 2, 255]);
    }

    #[test]
    fn group_count_covers_highest_group() {
        assert_eq!(group_count(&[]), 0);
        let resources = [
            resource("Projection", 0, 0, ResourceKind::Matrix4),
            resource("Texture", 2, 0, ResourceKind::Texture),
        ];
        assert_eq!(group_count(&resources), 3);
    }

    #[test]
    fn matrix_entries_require_a_full_mat4() {
        let entry = layout_entry(&resource("Modelview", 0, 1, ResourceKind::Matrix4)).unwrap();
        assert_eq!(entry.binding, 1);
        assert_eq!(entry.visibility, wgpu::ShaderStages::VERTEX);
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::Buffer { min_binding_size: Some(n), .. } if n.get() == 64
        ));
    }

    #[test]
    fn texture_and_sampler_entries_are_fragment_visible() {
        let tex = layout_entry(&resource("Texture", 0, 2, ResourceKind::Texture)).unwrap();
        assert_eq!(tex.visibility, wgpu::ShaderStages::FRAGMENT);
        let smp = layout_entry(&resource("TextureSampler", 0, 3, ResourceKind::Sampler)).unwrap();
        assert!(matches!(smp.ty, wgpu::BindingType::Sampler(_)));
        assert!(layout_entry(&resource("Odd", 0, 4, ResourceKind::Unsupported)).is_none());
    }

    // ── resource slots ────────────────────────────────────────────────────

    #[test]
    fn slots_never_reuse_removed_ids() {
        let mut slots: Slots<TextureHandle, &str> = Slots::default();
        let a = slots.insert("a");
        assert_eq!(slots.remove(a), Some("a"));
        let b = slots.insert("b");
        assert_ne!(a, b);
        assert!(slots.get(a).is_none());
        assert_eq!(slots.get(b), Some(&"b"));
    }

    #[test]
    fn target_slots_resolve_by_targets_handle() {
        let mut targets: Slots<TargetsHandle, PixelSize> = Slots::default();
        let first = targets.insert(PixelSize::new(800, 600));
        let second = targets.insert(PixelSize::new(400, 400));
        assert_eq!(first, TargetsHandle(0));
        assert_eq!(targets.get(second), Some(&PixelSize::new(400, 400)));

        targets.remove(first);
        assert!(targets.get(first).is_none());
        assert!(targets.get(TargetsHandle(7)).is_none());
    }
}
