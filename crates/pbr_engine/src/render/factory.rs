//! Resource factory
//!
//! Creates and releases textures, framebuffers and vertex buffers on a
//! [`GraphicsDevice`]. Creation either returns a fully built handle or
//! releases whatever it had already allocated before returning the error.

use crate::assets::{ImageData, Mesh, PixelData, Vertex};
use crate::render::device::{
    Attachment, BackendResult, BufferMask, GraphicsDevice, PixelFormat, TexelData, TextureFilter,
    TextureFormat, TextureTarget, VertexAttribute,
};
use crate::render::resources::{AttachmentTarget, FrameBuffer, Texture, VertexBuffer};
use crate::render::RenderError;

/// Interleaved `vec2` position and `vec2` texcoord, drawn as a 4-vertex strip
const CLIP_SPACE_QUAD: [f32; 16] = [
    1.0, 1.0, 1.0, 1.0, //
    -1.0, 1.0, 0.0, 1.0, //
    1.0, -1.0, 1.0, 0.0, //
    -1.0, -1.0, 0.0, 0.0, //
];

/// Requested mip chain length of a new texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipLevels {
    /// Every level down to 1x1
    Full,
    /// Exactly this many levels; zero means [`MipLevels::Full`]
    Exact(u32),
}

impl MipLevels {
    /// Concrete level count for a texture of the given size
    pub fn resolve(self, width: u32, height: u32) -> u32 {
        match self {
            Self::Exact(levels) if levels > 0 => levels,
            _ => full_mip_levels(width, height),
        }
    }
}

/// `1 + floor(log2(max(width, height)))`, and 1 for an empty extent
pub fn full_mip_levels(width: u32, height: u32) -> u32 {
    (u32::BITS - (width | height).leading_zeros()).max(1)
}

/// Creates and releases GPU resources on a device
pub struct ResourceFactory<'a, D: GraphicsDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: GraphicsDevice + ?Sized> ResourceFactory<'a, D> {
    /// Borrow a device for resource management
    pub fn new(device: &'a mut D) -> Self {
        Self { device }
    }

    /// Create a texture with immutable storage and default filtering
    pub fn create_texture(
        &mut self,
        target: TextureTarget,
        width: u32,
        height: u32,
        format: TextureFormat,
        levels: MipLevels,
    ) -> BackendResult<Texture> {
        let mut texture = Texture {
            id: None,
            width,
            height,
            levels: levels.resolve(width, height),
        };

        let id = self.device.create_texture(target)?;
        texture.id = Some(id);

        if let Err(e) = self
            .device
            .texture_storage(id, texture.levels, format, width, height)
        {
            self.delete_texture(&mut texture);
            return Err(e);
        }

        let min_filter = if texture.levels > 1 {
            TextureFilter::LinearMipmapLinear
        } else {
            TextureFilter::Linear
        };
        self.device.texture_filter(id, min_filter, TextureFilter::Linear);

        log::debug!(
            "Created {:?} texture {}x{} {:?} with {} level(s)",
            target,
            width,
            height,
            format,
            texture.levels
        );
        Ok(texture)
    }

    /// Create a 2D texture sized from an image and upload its pixels
    ///
    /// Float images upload as float data, all others as bytes. The mip chain
    /// is generated when more than one level is allocated.
    pub fn create_texture_from_image(
        &mut self,
        image: &ImageData,
        format: PixelFormat,
        internal_format: TextureFormat,
        levels: MipLevels,
    ) -> BackendResult<Texture> {
        if format.channels() != image.channels {
            return Err(RenderError::InvalidImage(format!(
                "{:?} upload needs {} channel(s), image has {}",
                format,
                format.channels(),
                image.channels
            )));
        }

        let texture = self.create_texture(
            TextureTarget::Texture2D,
            image.width,
            image.height,
            internal_format,
            levels,
        )?;
        let Some(id) = texture.id else {
            return Ok(texture);
        };

        let data = match &image.pixels {
            PixelData::Float(values) => TexelData::Float(values),
            PixelData::Byte(values) => TexelData::Byte(values),
        };
        self.device
            .texture_sub_image(id, 0, texture.width, texture.height, format, data);

        if texture.levels > 1 {
            self.device.generate_mipmap(id);
        }
        Ok(texture)
    }

    /// Release a texture and reset the handle
    pub fn delete_texture(&mut self, texture: &mut Texture) {
        let texture = std::mem::take(texture);
        if let Some(id) = texture.id {
            self.device.delete_texture(id);
        }
    }

    /// Create a framebuffer with optional color and depth/stencil attachments
    ///
    /// With `samples > 0` both attachments are multisampled renderbuffers.
    /// Otherwise the color attachment is a single-level texture that can be
    /// sampled later and depth/stencil is a plain renderbuffer.
    pub fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        samples: u32,
        color_format: Option<TextureFormat>,
        depth_stencil_format: Option<TextureFormat>,
    ) -> BackendResult<FrameBuffer> {
        let mut framebuffer = FrameBuffer {
            id: None,
            width,
            height,
            samples,
            color_target: None,
            depth_stencil_target: None,
        };

        if let Err(e) =
            self.build_framebuffer(&mut framebuffer, color_format, depth_stencil_format)
        {
            self.delete_framebuffer(&mut framebuffer);
            return Err(e);
        }

        log::info!(
            "Created framebuffer {}x{} ({} samples, color {:?}, depth/stencil {:?})",
            width,
            height,
            samples,
            color_format,
            depth_stencil_format
        );
        Ok(framebuffer)
    }

    fn build_framebuffer(
        &mut self,
        fb: &mut FrameBuffer,
        color_format: Option<TextureFormat>,
        depth_stencil_format: Option<TextureFormat>,
    ) -> BackendResult<()> {
        let id = self.device.create_framebuffer()?;
        fb.id = Some(id);

        if let Some(format) = color_format {
            if fb.samples > 0 {
                let color = self.device.create_renderbuffer()?;
                fb.color_target = Some(AttachmentTarget::Renderbuffer(color));
                self.device
                    .renderbuffer_storage(color, fb.samples, format, fb.width, fb.height)?;
                self.device
                    .framebuffer_renderbuffer(id, Attachment::Color0, color);
            } else {
                let color = self.device.create_texture(TextureTarget::Texture2D)?;
                fb.color_target = Some(AttachmentTarget::Texture(color));
                self.device
                    .texture_storage(color, 1, format, fb.width, fb.height)?;
                self.device
                    .framebuffer_texture(id, Attachment::Color0, color, 0);
            }
        }

        if let Some(format) = depth_stencil_format {
            let depth_stencil = self.device.create_renderbuffer()?;
            fb.depth_stencil_target = Some(depth_stencil);
            self.device
                .renderbuffer_storage(depth_stencil, fb.samples, format, fb.width, fb.height)?;
            self.device
                .framebuffer_renderbuffer(id, Attachment::DepthStencil, depth_stencil);
        }

        let status = self.device.check_framebuffer_status(id);
        if !status.is_complete() {
            return Err(RenderError::FramebufferIncomplete { status: status.0 });
        }
        Ok(())
    }

    /// Resolve `src` into `dst` with a nearest color blit
    ///
    /// Does nothing when both handles name the same framebuffer. After the
    /// blit every attachment `src` has is invalidated.
    pub fn resolve_framebuffer(&mut self, src: &FrameBuffer, dst: &FrameBuffer) {
        if src.id == dst.id {
            return;
        }
        let (Some(src_id), Some(dst_id)) = (src.id, dst.id) else {
            return;
        };

        let mut attachments = Vec::with_capacity(2);
        if src.color_target.is_some() {
            attachments.push(Attachment::Color0);
        }
        if src.depth_stencil_target.is_some() {
            attachments.push(Attachment::DepthStencil);
        }
        debug_assert!(!attachments.is_empty(), "complete framebuffer without attachments");

        self.device.blit_framebuffer(
            src_id,
            dst_id,
            [0, 0, src.width as i32 - 1, src.height as i32 - 1],
            [0, 0, dst.width as i32 - 1, dst.height as i32 - 1],
            BufferMask::COLOR,
            TextureFilter::Nearest,
        );
        if !attachments.is_empty() {
            self.device.invalidate_framebuffer(src_id, &attachments);
        }
    }

    /// Release a framebuffer with its attachments and reset the handle
    pub fn delete_framebuffer(&mut self, framebuffer: &mut FrameBuffer) {
        let framebuffer = std::mem::take(framebuffer);
        if let Some(id) = framebuffer.id {
            self.device.delete_framebuffer(id);
        }
        match framebuffer.color_target {
            Some(AttachmentTarget::Texture(texture)) => self.device.delete_texture(texture),
            Some(AttachmentTarget::Renderbuffer(renderbuffer)) => {
                self.device.delete_renderbuffer(renderbuffer);
            }
            None => {}
        }
        if let Some(depth_stencil) = framebuffer.depth_stencil_target {
            self.device.delete_renderbuffer(depth_stencil);
        }
    }

    /// Upload a mesh into immutable vertex and index stores
    pub fn create_vertex_buffer(&mut self, mesh: &Mesh) -> BackendResult<VertexBuffer> {
        if mesh.faces().is_empty() || mesh.vertices().is_empty() {
            return Err(RenderError::ResourceAllocation(
                "Cannot create a vertex buffer from an empty mesh".to_string(),
            ));
        }

        let mut buffer = VertexBuffer {
            num_elements: mesh.faces().len() as u32 * 3,
            ..VertexBuffer::default()
        };

        let attributes = (0..Vertex::ATTRIBUTE_COUNT).map(|index| VertexAttribute {
            index,
            components: Vertex::attribute_components(index),
            offset: Vertex::attribute_offset(index),
            stride: Vertex::STRIDE,
        });

        if let Err(e) = self.build_vertex_buffer(
            &mut buffer,
            mesh.vertex_bytes(),
            Some(mesh.index_bytes()),
            attributes,
        ) {
            self.delete_vertex_buffer(&mut buffer);
            return Err(e);
        }

        log::debug!(
            "Created vertex buffer: {} vertices, {} indices",
            mesh.vertices().len(),
            buffer.num_elements
        );
        Ok(buffer)
    }

    /// Full-screen quad in clip space, non-indexed
    pub fn create_clip_space_quad(&mut self) -> BackendResult<VertexBuffer> {
        let mut buffer = VertexBuffer::default();
        let float_size = std::mem::size_of::<f32>();

        let attributes = (0..2).map(|index| VertexAttribute {
            index,
            components: 2,
            offset: index as usize * 2 * float_size,
            stride: 4 * float_size,
        });

        if let Err(e) = self.build_vertex_buffer(
            &mut buffer,
            bytemuck::cast_slice(&CLIP_SPACE_QUAD),
            None,
            attributes,
        ) {
            self.delete_vertex_buffer(&mut buffer);
            return Err(e);
        }
        Ok(buffer)
    }

    fn build_vertex_buffer(
        &mut self,
        buffer: &mut VertexBuffer,
        vertex_data: &[u8],
        index_data: Option<&[u8]>,
        attributes: impl Iterator<Item = VertexAttribute>,
    ) -> BackendResult<()> {
        let vbo = self.device.create_buffer(vertex_data)?;
        buffer.vbo = Some(vbo);

        if let Some(index_data) = index_data {
            buffer.ibo = Some(self.device.create_buffer(index_data)?);
        }

        let vao = self.device.create_vertex_array()?;
        buffer.vao = Some(vao);

        if let Some(ibo) = buffer.ibo {
            self.device.vertex_array_element_buffer(vao, ibo);
        }
        for attribute in attributes {
            self.device.vertex_array_attribute(vao, vbo, attribute);
        }
        Ok(())
    }

    /// Release a vertex buffer and reset the handle
    pub fn delete_vertex_buffer(&mut self, buffer: &mut VertexBuffer) {
        let buffer = std::mem::take(buffer);
        if let Some(vao) = buffer.vao {
            self.device.delete_vertex_array(vao);
        }
        if let Some(vbo) = buffer.vbo {
            self.device.delete_buffer(vbo);
        }
        if let Some(ibo) = buffer.ibo {
            self.device.delete_buffer(ibo);
        }
    }
}

/// Run `scope` with a texture that is released afterwards, whatever the outcome
pub fn with_transient_texture<D, T, F>(device: &mut D, mut texture: Texture, scope: F) -> BackendResult<T>
where
    D: GraphicsDevice + ?Sized,
    F: FnOnce(&mut D, &Texture) -> BackendResult<T>,
{
    let result = scope(&mut *device, &texture);
    ResourceFactory::new(device).delete_texture(&mut texture);
    result
}
