//! GPU resource handles
//!
//! Plain records of backend names plus the metadata the renderer needs.
//! Handles are single-owner: they are not `Clone`, only the resource
//! factory fills in backend names, and releasing a handle resets it to its
//! `Default` (empty) value so a stale name can never be reused.

use crate::render::device::{
    BufferId, FramebufferId, ProgramId, RenderbufferId, TextureId, VertexArrayId,
};

/// Texture with immutable storage
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Texture {
    pub(crate) id: Option<TextureId>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) levels: u32,
}

impl Texture {
    /// Backend name, `None` once released
    pub fn id(&self) -> Option<TextureId> {
        self.id
    }

    /// Width of mip level 0
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of mip level 0
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Allocated mip level count
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// True for the empty record
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }
}

/// Storage behind a framebuffer's color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentTarget {
    /// Sampleable single-sample texture
    Texture(TextureId),
    /// Multisampled renderbuffer
    Renderbuffer(RenderbufferId),
}

/// Offscreen render target
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    pub(crate) id: Option<FramebufferId>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) samples: u32,
    pub(crate) color_target: Option<AttachmentTarget>,
    pub(crate) depth_stencil_target: Option<RenderbufferId>,
}

impl FrameBuffer {
    /// Backend name, `None` once released
    pub fn id(&self) -> Option<FramebufferId> {
        self.id
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// MSAA sample count, 0 when single-sampled
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Color attachment, if any
    pub fn color_target(&self) -> Option<AttachmentTarget> {
        self.color_target
    }

    /// Depth/stencil renderbuffer, if any
    pub fn depth_stencil_target(&self) -> Option<RenderbufferId> {
        self.depth_stencil_target
    }

    /// Color attachment when it can be sampled
    pub fn color_texture(&self) -> Option<TextureId> {
        match self.color_target {
            Some(AttachmentTarget::Texture(texture)) => Some(texture),
            _ => None,
        }
    }

    /// True for the empty record
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }
}

/// Vertex array with its vertex and index stores
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VertexBuffer {
    pub(crate) vao: Option<VertexArrayId>,
    pub(crate) vbo: Option<BufferId>,
    pub(crate) ibo: Option<BufferId>,
    pub(crate) num_elements: u32,
}

impl VertexBuffer {
    /// Vertex array name
    pub fn vertex_array(&self) -> Option<VertexArrayId> {
        self.vao
    }

    /// Vertex store name
    pub fn vertex_store(&self) -> Option<BufferId> {
        self.vbo
    }

    /// Index store name; `None` for non-indexed geometry
    pub fn index_store(&self) -> Option<BufferId> {
        self.ibo
    }

    /// Index count for indexed draws, three per triangle
    pub fn num_elements(&self) -> u32 {
        self.num_elements
    }

    /// True for the empty record
    pub fn is_empty(&self) -> bool {
        self.vao.is_none() && self.vbo.is_none() && self.ibo.is_none()
    }
}

/// Linked shader program
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShaderProgram {
    pub(crate) id: Option<ProgramId>,
}

impl ShaderProgram {
    /// Backend name, `None` once released
    pub fn id(&self) -> Option<ProgramId> {
        self.id
    }

    /// True for the empty record
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }
}
