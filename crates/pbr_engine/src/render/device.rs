//! Graphics device abstraction
//!
//! The renderer issues every GPU command through [`GraphicsDevice`]. The
//! trait mirrors the direct-state-access subset of OpenGL 4.5 the renderer
//! uses, so a backend is a thin translation layer and the recording device
//! used in tests can observe the exact command stream.

use std::num::NonZeroU32;

use bitflags::bitflags;

use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wrap a raw backend name; zero is the null object
            pub const fn new(raw: u32) -> Option<Self> {
                match NonZeroU32::new(raw) {
                    Some(id) => Some(Self(id)),
                    None => None,
                }
            }

            /// Raw backend name
            pub const fn get(self) -> u32 {
                self.0.get()
            }

            /// Raw backend name as a non-zero value
            pub const fn raw(self) -> NonZeroU32 {
                self.0
            }
        }
    };
}

backend_id!(
    /// Texture object name
    TextureId
);
backend_id!(
    /// Renderbuffer object name
    RenderbufferId
);
backend_id!(
    /// Framebuffer object name
    FramebufferId
);
backend_id!(
    /// Buffer object name
    BufferId
);
backend_id!(
    /// Vertex array object name
    VertexArrayId
);
backend_id!(
    /// Shader stage object name
    ShaderId
);
backend_id!(
    /// Program object name
    ProgramId
);

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    /// 2D texture
    Texture2D,
    /// Six-faced cubemap
    CubeMap,
}

/// Sized internal storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit single channel
    R8,
    /// 8-bit RGB
    Rgb8,
    /// 8-bit RGB, sRGB encoded
    Srgb8,
    /// 8-bit RGBA
    Rgba8,
    /// Half-float two channel
    Rg16F,
    /// Half-float RGB
    Rgb16F,
    /// Half-float RGBA
    Rgba16F,
    /// Packed depth and stencil
    Depth24Stencil8,
}

/// Channel layout of client pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One channel
    Red,
    /// Two channels
    Rg,
    /// Three channels
    Rgb,
    /// Four channels
    Rgba,
}

impl PixelFormat {
    /// Layout with the given channel count
    pub const fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::Red),
            2 => Some(Self::Rg),
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }

    /// Channel count of this layout
    pub const fn channels(self) -> u8 {
        match self {
            Self::Red => 1,
            Self::Rg => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Borrowed pixel data for an upload, float or byte typed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TexelData<'a> {
    /// 32-bit float components
    Float(&'a [f32]),
    /// 8-bit normalized components
    Byte(&'a [u8]),
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    Linear,
    /// Trilinear across mip levels
    LinearMipmapLinear,
}

/// Framebuffer attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// First color attachment
    Color0,
    /// Combined depth/stencil attachment
    DepthStencil,
}

bitflags! {
    /// Buffers selected for a clear or blit
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferMask: u32 {
        /// Color buffer
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
        /// Stencil buffer
        const STENCIL = 1 << 2;
    }
}

bitflags! {
    /// Memory visibility barriers between shader writes and later reads
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryBarrier: u32 {
        /// Image load/store from shaders
        const SHADER_IMAGE_ACCESS = 1 << 0;
        /// Texture sampling
        const TEXTURE_FETCH = 1 << 1;
        /// Texture uploads, downloads and mip generation
        const TEXTURE_UPDATE = 1 << 2;
        /// Every barrier kind
        const ALL = Self::SHADER_IMAGE_ACCESS.bits()
            | Self::TEXTURE_FETCH.bits()
            | Self::TEXTURE_UPDATE.bits();
    }
}

/// Server-side capability toggled with enable/disable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Back-face culling
    CullFace,
    /// Filtering across cubemap face edges
    TextureCubeMapSeamless,
}

/// Front-face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Counter-clockwise
    CounterClockwise,
    /// Clockwise
    Clockwise,
}

/// Primitive topology for draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
}

/// Shader stage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
    /// Compute shader
    Compute,
}

/// Image unit access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAccess {
    /// Load only
    ReadOnly,
    /// Store only
    WriteOnly,
    /// Load and store
    ReadWrite,
}

/// Value written to a program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `vec3`
    Vec3([f32; 3]),
    /// `mat4`, column-major
    Mat4([f32; 16]),
}

/// Result of a framebuffer completeness check, as the raw GL status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferStatus(pub u32);

impl FramebufferStatus {
    /// `GL_FRAMEBUFFER_COMPLETE`
    pub const COMPLETE: Self = Self(0x8CD5);
    /// `GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT`
    pub const INCOMPLETE_ATTACHMENT: Self = Self(0x8CD6);
    /// `GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT`
    pub const INCOMPLETE_MISSING_ATTACHMENT: Self = Self(0x8CD7);

    /// True when the framebuffer can be rendered to
    pub const fn is_complete(self) -> bool {
        self.0 == Self::COMPLETE.0
    }
}

/// One float vertex attribute sourced from its own binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location and binding index
    pub index: u32,
    /// Float component count (1 to 4)
    pub components: u32,
    /// Byte offset of the first element in the buffer
    pub offset: usize,
    /// Byte distance between consecutive elements
    pub stride: usize,
}

/// Graphics API used by the renderer
///
/// Object creation and storage allocation can fail and return
/// [`RenderError`]; every other command is fire-and-forget, matching the
/// GL error model where steady-state errors are not checked.
pub trait GraphicsDevice {
    /// Create an empty texture object
    fn create_texture(&mut self, target: TextureTarget) -> BackendResult<TextureId>;

    /// Allocate immutable storage for `levels` mip levels
    fn texture_storage(
        &mut self,
        texture: TextureId,
        levels: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> BackendResult<()>;

    /// Upload a full mip level of a 2D texture
    fn texture_sub_image(
        &mut self,
        texture: TextureId,
        level: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: TexelData<'_>,
    );

    /// Set minification and magnification filters
    fn texture_filter(&mut self, texture: TextureId, min: TextureFilter, mag: TextureFilter);

    /// Regenerate levels `1..` from level 0
    fn generate_mipmap(&mut self, texture: TextureId);

    /// Delete a texture object
    fn delete_texture(&mut self, texture: TextureId);

    /// Create an empty renderbuffer object
    fn create_renderbuffer(&mut self) -> BackendResult<RenderbufferId>;

    /// Allocate renderbuffer storage; `samples == 0` is single-sampled
    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> BackendResult<()>;

    /// Delete a renderbuffer object
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);

    /// Create an empty framebuffer object
    fn create_framebuffer(&mut self) -> BackendResult<FramebufferId>;

    /// Attach a texture mip level
    fn framebuffer_texture(
        &mut self,
        framebuffer: FramebufferId,
        attachment: Attachment,
        texture: TextureId,
        level: u32,
    );

    /// Attach a renderbuffer
    fn framebuffer_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        attachment: Attachment,
        renderbuffer: RenderbufferId,
    );

    /// Completeness of a framebuffer used as a draw target
    fn check_framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus;

    /// Copy a rectangle between framebuffers; rectangles are `[x0, y0, x1, y1]`
    fn blit_framebuffer(
        &mut self,
        src: FramebufferId,
        dst: FramebufferId,
        src_rect: [i32; 4],
        dst_rect: [i32; 4],
        mask: BufferMask,
        filter: TextureFilter,
    );

    /// Declare attachment contents undefined
    fn invalidate_framebuffer(&mut self, framebuffer: FramebufferId, attachments: &[Attachment]);

    /// Bind a framebuffer for drawing; `None` is the window surface
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Delete a framebuffer object
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Create a buffer with immutable contents
    fn create_buffer(&mut self, data: &[u8]) -> BackendResult<BufferId>;

    /// Delete a buffer object
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Create an empty vertex array object
    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayId>;

    /// Use `buffer` as the index source of a vertex array
    fn vertex_array_element_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId);

    /// Enable and describe one attribute sourced from `buffer`
    fn vertex_array_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        buffer: BufferId,
        attribute: VertexAttribute,
    );

    /// Delete a vertex array object
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Create a shader object for one stage
    fn create_shader(&mut self, stage: ShaderStage) -> BackendResult<ShaderId>;

    /// Compile source text; returns the compile status
    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> bool;

    /// Diagnostic log of the last compile
    fn shader_info_log(&mut self, shader: ShaderId) -> String;

    /// Delete a shader object
    fn delete_shader(&mut self, shader: ShaderId);

    /// Create an empty program object
    fn create_program(&mut self) -> BackendResult<ProgramId>;

    /// Attach a compiled stage
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);

    /// Detach a stage
    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId);

    /// Link attached stages; returns the link status
    fn link_program(&mut self, program: ProgramId) -> bool;

    /// Validate a linked program; returns the validate status
    fn validate_program(&mut self, program: ProgramId) -> bool;

    /// Diagnostic log of the last link or validate
    fn program_info_log(&mut self, program: ProgramId) -> String;

    /// Delete a program object
    fn delete_program(&mut self, program: ProgramId);

    /// Make a program current
    fn use_program(&mut self, program: ProgramId);

    /// Set a uniform of `program` without making it current
    fn program_uniform(&mut self, program: ProgramId, location: u32, value: UniformValue);

    /// Bind a texture for sampling at `unit`
    fn bind_texture_unit(&mut self, unit: u32, texture: TextureId);

    /// Bind a texture level for image load/store at `unit`
    fn bind_image_texture(
        &mut self,
        unit: u32,
        texture: TextureId,
        level: u32,
        layered: bool,
        access: ImageAccess,
        format: TextureFormat,
    );

    /// Launch compute work groups
    fn dispatch_compute(&mut self, groups: [u32; 3]);

    /// Order earlier shader writes before the selected kinds of later access
    fn memory_barrier(&mut self, barriers: MemoryBarrier);

    /// Enable a capability
    fn enable(&mut self, capability: Capability);

    /// Disable a capability
    fn disable(&mut self, capability: Capability);

    /// Set the front-face winding
    fn front_face(&mut self, winding: Winding);

    /// Clear buffers of the bound framebuffer
    fn clear(&mut self, mask: BufferMask);

    /// Make a vertex array current
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Draw `count` `u32` indices from the current element buffer
    fn draw_elements(&mut self, primitive: Primitive, count: u32);

    /// Draw `count` vertices starting at `first`
    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);

    /// Block until all submitted work has completed
    fn finish(&mut self);
}
