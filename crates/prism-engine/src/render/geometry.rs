//! Static vertex/index tables and their one-time upload.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::error::SetupError;

use super::backend::{
    AttributeLocation, BufferHandle, BufferUsage, GraphicsBackend, VertexAttribute, VertexFormat,
    VertexLayout,
};

/// Interleaved vertex: position, color, texture coordinate.
///
/// Offsets are fixed: position at 0, color at 12, tex_coord at 28; stride 36.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u64 = size_of::<Vertex>() as u64;
    pub const POSITION_OFFSET: u64 = offset_of!(Vertex, position) as u64;
    pub const COLOR_OFFSET: u64 = offset_of!(Vertex, color) as u64;
    pub const TEX_COORD_OFFSET: u64 = offset_of!(Vertex, tex_coord) as u64;

    pub const fn new(position: [f32; 3], color: [f32; 4], tex_coord: [f32; 2]) -> Self {
        Self { position, color, tex_coord }
    }

    /// Attribute pointers for the given shader locations.
    ///
    /// `tex_coord` is `None` for variants whose shaders take no texture coordinate.
    pub fn layout(
        position: AttributeLocation,
        color: AttributeLocation,
        tex_coord: Option<AttributeLocation>,
    ) -> VertexLayout {
        let mut attributes = vec![
            VertexAttribute {
                location: position,
                format: VertexFormat::Float32x3,
                offset: Self::POSITION_OFFSET,
            },
            VertexAttribute {
                location: color,
                format: VertexFormat::Float32x4,
                offset: Self::COLOR_OFFSET,
            },
        ];
        if let Some(location) = tex_coord {
            attributes.push(VertexAttribute {
                location,
                format: VertexFormat::Float32x2,
                offset: Self::TEX_COORD_OFFSET,
            });
        }
        VertexLayout { stride: Self::STRIDE, attributes }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("index table is empty")]
    Empty,

    #[error("index count {0} is not a multiple of 3")]
    NotTriangles(usize),

    #[error("index {index} at position {position} is out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds {
        position: usize,
        index: u8,
        vertex_count: usize,
    },
}

/// Immutable vertex + index tables for one solid.
///
/// Construction validates that every index references a vertex and that the
/// indices form whole triangles; the tables cannot change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryData {
    vertices: Vec<Vertex>,
    indices: Vec<u8>,
}

impl GeometryData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u8>) -> Result<Self, GeometryError> {
        validate(&vertices, &indices)?;
        Ok(Self { vertices, indices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Copies both tables into static GPU buffers.
    pub fn upload<B: GraphicsBackend>(&self, backend: &mut B) -> Result<GeometryBuffers, SetupError> {
        validate(&self.vertices, &self.indices)?;

        let vertices =
            backend.create_static_buffer(BufferUsage::Vertex, bytemuck::cast_slice(&self.vertices))?;
        let indices = backend.create_static_buffer(BufferUsage::Index, &self.indices)?;

        log::debug!(
            "uploaded geometry: {} vertices, {} triangles",
            self.vertices.len(),
            self.triangle_count()
        );

        Ok(GeometryBuffers {
            vertices,
            indices,
            index_count: self.indices.len() as u32,
        })
    }

    /// Six-faced solid, 24 vertices and 36 indices, textured per face.
    ///
    /// The "back" face indices (`4,5,6, 4,5,7`) do not split the quad into two
    /// disjoint triangles; they are kept as authored.
    pub fn textured_cube() -> Self {
        Self {
            vertices: CUBE_VERTICES.to_vec(),
            indices: CUBE_INDICES.to_vec(),
        }
    }

    /// Single flat quad in the `z = 0` plane.
    pub fn quad() -> Self {
        Self {
            vertices: CUBE_VERTICES[..4].to_vec(),
            indices: QUAD_INDICES.to_vec(),
        }
    }
}

/// GPU buffers produced by [`GeometryData::upload`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GeometryBuffers {
    pub vertices: BufferHandle,
    pub indices: BufferHandle,
    pub index_count: u32,
}

fn validate(vertices: &[Vertex], indices: &[u8]) -> Result<(), GeometryError> {
    if indices.is_empty() {
        return Err(GeometryError::Empty);
    }
    if indices.len() % 3 != 0 {
        return Err(GeometryError::NotTriangles(indices.len()));
    }
    if let Some((position, &index)) = indices
        .iter()
        .enumerate()
        .find(|&(_, &i)| i as usize >= vertices.len())
    {
        return Err(GeometryError::IndexOutOfBounds {
            position,
            index,
            vertex_count: vertices.len(),
        });
    }
    Ok(())
}

const TEX_MAX: f32 = 1.0;

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[rustfmt::skip]
const CUBE_VERTICES: [Vertex; 24] = [
    // front
    Vertex::new([ 1.0, -1.0,  0.0], RED,   [TEX_MAX, 0.0]),
    Vertex::new([ 1.0,  1.0,  0.0], GREEN, [TEX_MAX, TEX_MAX]),
    Vertex::new([-1.0,  1.0,  0.0], BLUE,  [0.0, TEX_MAX]),
    Vertex::new([-1.0, -1.0,  0.0], BLACK, [0.0, 0.0]),
    // back
    Vertex::new([ 1.0,  1.0, -2.0], RED,   [TEX_MAX, 0.0]),
    Vertex::new([-1.0, -1.0, -2.0], GREEN, [TEX_MAX, TEX_MAX]),
    Vertex::new([ 1.0, -1.0, -2.0], BLUE,  [0.0, TEX_MAX]),
    Vertex::new([-1.0,  1.0, -2.0], BLACK, [0.0, 0.0]),
    // left
    Vertex::new([-1.0, -1.0,  0.0], RED,   [TEX_MAX, 0.0]),
    Vertex::new([-1.0,  1.0,  0.0], GREEN, [TEX_MAX, TEX_MAX]),
    Vertex::new([-1.0,  1.0, -2.0], BLUE,  [0.0, TEX_MAX]),
    Vertex::new([-1.0, -1.0, -2.0], BLACK, [0.0, 0.0]),
    // right
    Vertex::new([ 1.0, -1.0, -2.0], RED,   [TEX_MAX, 0.0]),
    Vertex::new([ 1.0,  1.0, -2.0], GREEN, [TEX_MAX, TEX_MAX]),
    Vertex::new([ 1.0,  1.0,  0.0], BLUE,  [0.0, TEX_MAX]),
    Vertex::new([ 1.0, -1.0,  0.0], BLACK, [0.0, 0.0]),
    // top
    Vertex::new([ 1.0,  1.0,  0.0], RED,   [TEX_MAX, 0.0]),
    Vertex::new([ 1.0,  1.0, -2.0], GREEN, [TEX_MAX, TEX_MAX]),
    Vertex::new([-1.0,  1.0, -2.0], BLUE,  [0.0, TEX_MAX]),
    Vertex::new([-1.0,  1.0,  0.0], BLACK, [0.0, 0.0]),
    // bottom
    Vertex::new([ 1.0, -1.0, -2.0], RED,   [TEX_MAX, 0.0]),
    Vertex::new([ 1.0, -1.0,  0.0], GREEN, [TEX_MAX, TEX_MAX]),
    Vertex::new([-1.0, -1.0,  0.0], BLUE,  [0.0, TEX_MAX]),
    Vertex::new([-1.0, -1.0, -2.0], BLACK, [0.0, 0.0]),
];

#[rustfmt::skip]
const CUBE_INDICES: [u8; 36] = [
    0, 1, 2,     2, 3, 0,     // front
    4, 5, 6,     4, 5, 7,     // back
    8, 9, 10,    10, 11, 8,   // left
    12, 13, 14,  14, 15, 12,  // right
    16, 17, 18,  18, 19, 16,  // top
    20, 21, 22,  22, 23, 20,  // bottom
];

const QUAD_INDICES: [u8; 6] = [0, 1, 2, 2, 3, 0];
