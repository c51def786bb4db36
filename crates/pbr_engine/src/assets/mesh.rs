//! Mesh data as consumed by the renderer
//!
//! The vertex layout is fixed: four `vec3` attributes followed by one `vec2`,
//! interleaved, bound to consecutive attribute slots.

use bytemuck::{Pod, Zeroable};

/// Interleaved mesh vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Unit surface normal
    pub normal: [f32; 3],
    /// Unit tangent, aligned with +U of the texture mapping
    pub tangent: [f32; 3],
    /// Unit bitangent, aligned with +V of the texture mapping
    pub bitangent: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Number of vertex attributes (slots `0..ATTRIBUTE_COUNT`)
    pub const ATTRIBUTE_COUNT: u32 = 5;

    /// Byte distance between consecutive vertices
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// Component count of attribute `index`: only the last one is a `vec2`
    pub const fn attribute_components(index: u32) -> u32 {
        if index == Self::ATTRIBUTE_COUNT - 1 {
            2
        } else {
            3
        }
    }

    /// Byte offset of attribute `index` inside a vertex
    pub const fn attribute_offset(index: u32) -> usize {
        index as usize * std::mem::size_of::<[f32; 3]>()
    }
}

/// Triangle of three vertex indices
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Face {
    /// Vertex indices, counter-clockwise
    pub indices: [u32; 3],
}

impl Face {
    /// Create a face from three vertex indices
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }
}

/// Triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
}

impl Mesh {
    /// Create a mesh from vertices and triangles
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Self {
        Self { vertices, faces }
    }

    /// All vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All triangles
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Vertex data as raw bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes for upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.faces)
    }
}
