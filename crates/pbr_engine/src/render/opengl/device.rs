//! glow implementation of [`GraphicsDevice`]
//!
//! The device API is direct-state-access shaped. glow exposes the bind-to-edit
//! entry points, so object edits bind the object, apply the change and
//! restore the framebuffer, program and vertex array bindings the renderer
//! relies on.

use std::collections::HashMap;
use std::ffi::c_void;

use glow::HasContext;

use crate::render::device::{
    Attachment, BackendResult, BufferId, BufferMask, Capability, FramebufferId, FramebufferStatus,
    GraphicsDevice, ImageAccess, MemoryBarrier, PixelFormat, Primitive, ProgramId, RenderbufferId,
    ShaderId, ShaderStage, TexelData, TextureFilter, TextureFormat, TextureId, TextureTarget,
    UniformValue, VertexArrayId, VertexAttribute, Winding,
};
use crate::render::RenderError;

type ValidateProgramFn = unsafe extern "system" fn(u32);
type GetProgramIvFn = unsafe extern "system" fn(u32, u32, *mut i32);

/// `glValidateProgram` and `glGetProgramiv`, which glow does not wrap
#[derive(Clone, Copy)]
pub struct ProgramValidation {
    validate_program: ValidateProgramFn,
    get_program_iv: GetProgramIvFn,
}

impl ProgramValidation {
    /// Resolve both entry points through the context's loader
    pub fn load(mut get_proc_address: impl FnMut(&str) -> *const c_void) -> BackendResult<Self> {
        let validate_program = get_proc_address("glValidateProgram");
        let get_program_iv = get_proc_address("glGetProgramiv");
        if validate_program.is_null() || get_program_iv.is_null() {
            return Err(RenderError::ContextCreation(
                "glValidateProgram/glGetProgramiv not exposed by the context".to_string(),
            ));
        }

        // Both pointers come from the GL loader for these exact prototypes.
        unsafe {
            Ok(Self {
                validate_program: std::mem::transmute::<*const c_void, ValidateProgramFn>(validate_program),
                get_program_iv: std::mem::transmute::<*const c_void, GetProgramIvFn>(get_program_iv),
            })
        }
    }

    /// Run validation and read back `GL_VALIDATE_STATUS`
    ///
    /// # Safety
    /// The context the pointers were loaded from must be current.
    unsafe fn validate(&self, program: ProgramId) -> bool {
        let mut status = 0;
        (self.validate_program)(program.get());
        (self.get_program_iv)(program.get(), glow::VALIDATE_STATUS, &mut status);
        status != 0
    }
}

/// Upper bound on queued error flags drained before an allocation
const MAX_PENDING_ERRORS: usize = 16;

/// Pop error flags until `next` reports none, returning how many were dropped
fn drain_errors(mut next: impl FnMut() -> u32) -> usize {
    (0..MAX_PENDING_ERRORS)
        .take_while(|_| next() != glow::NO_ERROR)
        .count()
}

fn allocation_result(what: &str, error: u32) -> BackendResult<()> {
    match error {
        glow::NO_ERROR => Ok(()),
        glow::OUT_OF_MEMORY => Err(RenderError::ResourceAllocation(format!(
            "{what}: out of memory"
        ))),
        other => Err(RenderError::ResourceAllocation(format!(
            "{what}: GL error 0x{other:04X}"
        ))),
    }
}

/// OpenGL 4.5 device over a current glow context
pub struct GlowDevice {
    gl: glow::Context,
    validation: ProgramValidation,
    texture_targets: HashMap<TextureId, u32>,
    bound_framebuffer: Option<FramebufferId>,
    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
}

impl GlowDevice {
    /// Wrap a context that is current on this thread
    pub fn new(gl: glow::Context, validation: ProgramValidation) -> Self {
        unsafe {
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            log::info!("OpenGL 4.5 Renderer: {}", gl.get_parameter_string(glow::RENDERER));
            log::info!("OpenGL version: {}", gl.get_parameter_string(glow::VERSION));
        }
        Self {
            gl,
            validation,
            texture_targets: HashMap::new(),
            bound_framebuffer: None,
            current_program: None,
            bound_vertex_array: None,
        }
    }

    /// The wrapped context
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    /// Drop error flags raised by earlier unchecked calls
    fn clear_pending_errors(&self) {
        let dropped = drain_errors(|| unsafe { self.gl.get_error() });
        if dropped > 0 {
            log::warn!("Discarded {} pending GL error(s) before allocation", dropped);
        }
    }

    /// Check the allocation issued since [`Self::clear_pending_errors`]
    fn check_allocation(&self, what: &str) -> BackendResult<()> {
        allocation_result(what, unsafe { self.gl.get_error() })
    }

    fn texture_target(&self, texture: TextureId) -> u32 {
        self.texture_targets
            .get(&texture)
            .copied()
            .unwrap_or(glow::TEXTURE_2D)
    }

    fn bind_texture_for_edit(&self, texture: TextureId) -> u32 {
        let target = self.texture_target(texture);
        unsafe { self.gl.bind_texture(target, Some(native_texture(texture))) };
        target
    }

    fn with_framebuffer<T>(&self, framebuffer: FramebufferId, edit: impl FnOnce(&glow::Context) -> T) -> T {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(native_framebuffer(framebuffer)));
            let result = edit(&self.gl);
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, self.bound_framebuffer.map(native_framebuffer));
            result
        }
    }

    fn with_vertex_array(&self, vertex_array: VertexArrayId, edit: impl FnOnce(&glow::Context)) {
        unsafe {
            self.gl
                .bind_vertex_array(Some(native_vertex_array(vertex_array)));
            edit(&self.gl);
            self.gl
                .bind_vertex_array(self.bound_vertex_array.map(native_vertex_array));
        }
    }
}

fn native_texture(id: TextureId) -> glow::NativeTexture {
    glow::NativeTexture(id.raw())
}

fn native_renderbuffer(id: RenderbufferId) -> glow::NativeRenderbuffer {
    glow::NativeRenderbuffer(id.raw())
}

fn native_framebuffer(id: FramebufferId) -> glow::NativeFramebuffer {
    glow::NativeFramebuffer(id.raw())
}

fn native_buffer(id: BufferId) -> glow::NativeBuffer {
    glow::NativeBuffer(id.raw())
}

fn native_vertex_array(id: VertexArrayId) -> glow::NativeVertexArray {
    glow::NativeVertexArray(id.raw())
}

fn native_shader(id: ShaderId) -> glow::NativeShader {
    glow::NativeShader(id.raw())
}

fn native_program(id: ProgramId) -> glow::NativeProgram {
    glow::NativeProgram(id.raw())
}

fn creation_error(what: &str, message: String) -> RenderError {
    RenderError::ResourceAllocation(format!("{what}: {message}"))
}

const fn internal_format(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::R8 => glow::R8,
        TextureFormat::Rgb8 => glow::RGB8,
        TextureFormat::Srgb8 => glow::SRGB8,
        TextureFormat::Rgba8 => glow::RGBA8,
        TextureFormat::Rg16F => glow::RG16F,
        TextureFormat::Rgb16F => glow::RGB16F,
        TextureFormat::Rgba16F => glow::RGBA16F,
        TextureFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
    }
}

const fn pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Red => glow::RED,
        PixelFormat::Rg => glow::RG,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
    }
}

const fn filter(filter: TextureFilter) -> i32 {
    let value = match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    };
    value as i32
}

const fn attachment(attachment: Attachment) -> u32 {
    match attachment {
        Attachment::Color0 => glow::COLOR_ATTACHMENT0,
        Attachment::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
    }
}

fn buffer_mask(mask: BufferMask) -> u32 {
    let mut bits = 0;
    if mask.contains(BufferMask::COLOR) {
        bits |= glow::COLOR_BUFFER_BIT;
    }
    if mask.contains(BufferMask::DEPTH) {
        bits |= glow::DEPTH_BUFFER_BIT;
    }
    if mask.contains(BufferMask::STENCIL) {
        bits |= glow::STENCIL_BUFFER_BIT;
    }
    bits
}

fn barrier_bits(barriers: MemoryBarrier) -> u32 {
    let mut bits = 0;
    if barriers.contains(MemoryBarrier::SHADER_IMAGE_ACCESS) {
        bits |= glow::SHADER_IMAGE_ACCESS_BARRIER_BIT;
    }
    if barriers.contains(MemoryBarrier::TEXTURE_FETCH) {
        bits |= glow::TEXTURE_FETCH_BARRIER_BIT;
    }
    if barriers.contains(MemoryBarrier::TEXTURE_UPDATE) {
        bits |= glow::TEXTURE_UPDATE_BARRIER_BIT;
    }
    bits
}

const fn capability(capability: Capability) -> u32 {
    match capability {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::TextureCubeMapSeamless => glow::TEXTURE_CUBE_MAP_SEAMLESS,
    }
}

const fn primitive(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

impl GraphicsDevice for GlowDevice {
    fn create_texture(&mut self, target: TextureTarget) -> BackendResult<TextureId> {
        let gl_target = match target {
            TextureTarget::Texture2D => glow::TEXTURE_2D,
            TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
        };
        let texture = unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|e| creation_error("Texture", e))?;
            // First bind fixes the texture's target
            self.gl.bind_texture(gl_target, Some(texture));
            texture
        };
        let id = TextureId::new(texture.0.get())
            .ok_or_else(|| RenderError::ResourceAllocation("null texture name".to_string()))?;
        self.texture_targets.insert(id, gl_target);
        Ok(id)
    }

    fn texture_storage(
        &mut self,
        texture: TextureId,
        levels: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        self.clear_pending_errors();
        let target = self.bind_texture_for_edit(texture);
        unsafe {
            self.gl.tex_storage_2d(
                target,
                levels as i32,
                internal_format(format),
                width as i32,
                height as i32,
            );
        }
        self.check_allocation("Texture storage")
    }

    fn texture_sub_image(
        &mut self,
        texture: TextureId,
        level: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: TexelData<'_>,
    ) {
        let target = self.bind_texture_for_edit(texture);
        let (data_type, bytes): (u32, &[u8]) = match data {
            TexelData::Float(values) => (glow::FLOAT, bytemuck::cast_slice(values)),
            TexelData::Byte(values) => (glow::UNSIGNED_BYTE, values),
        };
        unsafe {
            self.gl.tex_sub_image_2d(
                target,
                level as i32,
                0,
                0,
                width as i32,
                height as i32,
                pixel_format(format),
                data_type,
                glow::PixelUnpackData::Slice(bytes),
            );
        }
    }

    fn texture_filter(&mut self, texture: TextureId, min: TextureFilter, mag: TextureFilter) {
        let target = self.bind_texture_for_edit(texture);
        unsafe {
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, filter(min));
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, filter(mag));
        }
    }

    fn generate_mipmap(&mut self, texture: TextureId) {
        let target = self.bind_texture_for_edit(texture);
        unsafe { self.gl.generate_mipmap(target) };
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.texture_targets.remove(&texture);
        unsafe { self.gl.delete_texture(native_texture(texture)) };
    }

    fn create_renderbuffer(&mut self) -> BackendResult<RenderbufferId> {
        let renderbuffer = unsafe { self.gl.create_renderbuffer() }
            .map_err(|e| creation_error("Renderbuffer", e))?;
        RenderbufferId::new(renderbuffer.0.get())
            .ok_or_else(|| RenderError::ResourceAllocation("null renderbuffer name".to_string()))
    }

    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        self.clear_pending_errors();
        unsafe {
            self.gl
                .bind_renderbuffer(glow::RENDERBUFFER, Some(native_renderbuffer(renderbuffer)));
            self.gl.renderbuffer_storage_multisample(
                glow::RENDERBUFFER,
                samples as i32,
                internal_format(format),
                width as i32,
                height as i32,
            );
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, None);
        }
        self.check_allocation("Renderbuffer storage")
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        unsafe { self.gl.delete_renderbuffer(native_renderbuffer(renderbuffer)) };
    }

    fn create_framebuffer(&mut self) -> BackendResult<FramebufferId> {
        let framebuffer = unsafe { self.gl.create_framebuffer() }
            .map_err(|e| creation_error("Framebuffer", e))?;
        FramebufferId::new(framebuffer.0.get())
            .ok_or_else(|| RenderError::ResourceAllocation("null framebuffer name".to_string()))
    }

    fn framebuffer_texture(
        &mut self,
        framebuffer: FramebufferId,
        attachment_point: Attachment,
        texture: TextureId,
        level: u32,
    ) {
        let target = self.texture_target(texture);
        self.with_framebuffer(framebuffer, |gl| unsafe {
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment(attachment_point),
                target,
                Some(native_texture(texture)),
                level as i32,
            );
        });
    }

    fn framebuffer_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        attachment_point: Attachment,
        renderbuffer: RenderbufferId,
    ) {
        self.with_framebuffer(framebuffer, |gl| unsafe {
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment(attachment_point),
                glow::RENDERBUFFER,
                Some(native_renderbuffer(renderbuffer)),
            );
        });
    }

    fn check_framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus {
        self.with_framebuffer(framebuffer, |gl| unsafe {
            FramebufferStatus(gl.check_framebuffer_status(glow::FRAMEBUFFER))
        })
    }

    fn blit_framebuffer(
        &mut self,
        src: FramebufferId,
        dst: FramebufferId,
        src_rect: [i32; 4],
        dst_rect: [i32; 4],
        mask: BufferMask,
        filter_mode: TextureFilter,
    ) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::READ_FRAMEBUFFER, Some(native_framebuffer(src)));
            self.gl
                .bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(native_framebuffer(dst)));
            self.gl.blit_framebuffer(
                src_rect[0],
                src_rect[1],
                src_rect[2],
                src_rect[3],
                dst_rect[0],
                dst_rect[1],
                dst_rect[2],
                dst_rect[3],
                buffer_mask(mask),
                filter(filter_mode) as u32,
            );
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, self.bound_framebuffer.map(native_framebuffer));
        }
    }

    fn invalidate_framebuffer(&mut self, framebuffer: FramebufferId, attachments: &[Attachment]) {
        let points: Vec<u32> = attachments.iter().map(|a| attachment(*a)).collect();
        self.with_framebuffer(framebuffer, |gl| unsafe {
            gl.invalidate_framebuffer(glow::FRAMEBUFFER, &points);
        });
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.bound_framebuffer = framebuffer;
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, framebuffer.map(native_framebuffer));
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
        unsafe { self.gl.delete_framebuffer(native_framebuffer(framebuffer)) };
    }

    fn create_buffer(&mut self, data: &[u8]) -> BackendResult<BufferId> {
        self.clear_pending_errors();
        let buffer = unsafe {
            let buffer = self
                .gl
                .create_buffer()
                .map_err(|e| creation_error("Buffer", e))?;
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::COPY_WRITE_BUFFER, data, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
            buffer
        };
        let id = BufferId::new(buffer.0.get())
            .ok_or_else(|| RenderError::ResourceAllocation("null buffer name".to_string()))?;
        if let Err(e) = self.check_allocation("Buffer storage") {
            self.delete_buffer(id);
            return Err(e);
        }
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        unsafe { self.gl.delete_buffer(native_buffer(buffer)) };
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayId> {
        let vertex_array = unsafe { self.gl.create_vertex_array() }
            .map_err(|e| creation_error("Vertex array", e))?;
        VertexArrayId::new(vertex_array.0.get())
            .ok_or_else(|| RenderError::ResourceAllocation("null vertex array name".to_string()))
    }

    fn vertex_array_element_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) {
        self.with_vertex_array(vertex_array, |gl| unsafe {
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(native_buffer(buffer)));
        });
    }

    fn vertex_array_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        buffer: BufferId,
        attribute: VertexAttribute,
    ) {
        self.with_vertex_array(vertex_array, |gl| unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(native_buffer(buffer)));
            gl.enable_vertex_attrib_array(attribute.index);
            gl.vertex_attrib_pointer_f32(
                attribute.index,
                attribute.components as i32,
                glow::FLOAT,
                false,
                attribute.stride as i32,
                attribute.offset as i32,
            );
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        });
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
        unsafe { self.gl.delete_vertex_array(native_vertex_array(vertex_array)) };
    }

    fn create_shader(&mut self, stage: ShaderStage) -> BackendResult<ShaderId> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
            ShaderStage::Compute => glow::COMPUTE_SHADER,
        };
        let shader = unsafe { self.gl.create_shader(kind) }.map_err(|e| creation_error("Shader", e))?;
        ShaderId::new(shader.0.get())
            .ok_or_else(|| RenderError::ResourceAllocation("null shader name".to_string()))
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> bool {
        let shader = native_shader(shader);
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&mut self, shader: ShaderId) -> String {
        unsafe { self.gl.get_shader_info_log(native_shader(shader)) }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        unsafe { self.gl.delete_shader(native_shader(shader)) };
    }

    fn create_program(&mut self) -> BackendResult<ProgramId> {
        let program = unsafe { self.gl.create_program() }.map_err(|e| creation_error("Program", e))?;
        ProgramId::new(program.0.get())
            .ok_or_else(|| RenderError::ResourceAllocation("null program name".to_string()))
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        unsafe {
            self.gl
                .attach_shader(native_program(program), native_shader(shader));
        }
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        unsafe {
            self.gl
                .detach_shader(native_program(program), native_shader(shader));
        }
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        let program = native_program(program);
        unsafe {
            self.gl.link_program(program);
            self.gl.get_program_link_status(program)
        }
    }

    fn validate_program(&mut self, program: ProgramId) -> bool {
        unsafe { self.validation.validate(program) }
    }

    fn program_info_log(&mut self, program: ProgramId) -> String {
        unsafe { self.gl.get_program_info_log(native_program(program)) }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        unsafe { self.gl.delete_program(native_program(program)) };
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = Some(program);
        unsafe { self.gl.use_program(Some(native_program(program))) };
    }

    fn program_uniform(&mut self, program: ProgramId, location: u32, value: UniformValue) {
        let location = glow::NativeUniformLocation(location);
        unsafe {
            self.gl.use_program(Some(native_program(program)));
            match value {
                UniformValue::Float(v) => self.gl.uniform_1_f32(Some(&location), v),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(Some(&location), x, y, z),
                UniformValue::Mat4(m) => self
                    .gl
                    .uniform_matrix_4_f32_slice(Some(&location), false, &m),
            }
            self.gl.use_program(self.current_program.map(native_program));
        }
    }

    fn bind_texture_unit(&mut self, unit: u32, texture: TextureId) {
        let target = self.texture_target(texture);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(target, Some(native_texture(texture)));
        }
    }

    fn bind_image_texture(
        &mut self,
        unit: u32,
        texture: TextureId,
        level: u32,
        layered: bool,
        access: ImageAccess,
        format: TextureFormat,
    ) {
        let access = match access {
            ImageAccess::ReadOnly => glow::READ_ONLY,
            ImageAccess::WriteOnly => glow::WRITE_ONLY,
            ImageAccess::ReadWrite => glow::READ_WRITE,
        };
        unsafe {
            self.gl.bind_image_texture(
                unit,
                native_texture(texture),
                level as i32,
                layered,
                0,
                access,
                internal_format(format),
            );
        }
    }

    fn dispatch_compute(&mut self, groups: [u32; 3]) {
        unsafe { self.gl.dispatch_compute(groups[0], groups[1], groups[2]) };
    }

    fn memory_barrier(&mut self, barriers: MemoryBarrier) {
        unsafe { self.gl.memory_barrier(barrier_bits(barriers)) };
    }

    fn enable(&mut self, cap: Capability) {
        unsafe { self.gl.enable(capability(cap)) };
    }

    fn disable(&mut self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) };
    }

    fn front_face(&mut self, winding: Winding) {
        let mode = match winding {
            Winding::CounterClockwise => glow::CCW,
            Winding::Clockwise => glow::CW,
        };
        unsafe { self.gl.front_face(mode) };
    }

    fn clear(&mut self, mask: BufferMask) {
        unsafe { self.gl.clear(buffer_mask(mask)) };
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.bound_vertex_array = Some(vertex_array);
        unsafe {
            self.gl
                .bind_vertex_array(Some(native_vertex_array(vertex_array)));
        }
    }

    fn draw_elements(&mut self, mode: Primitive, count: u32) {
        unsafe {
            self.gl
                .draw_elements(primitive(mode), count as i32, glow::UNSIGNED_INT, 0);
        }
    }

    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) {
        unsafe {
            self.gl
                .draw_arrays(primitive(mode), first as i32, count as i32);
        }
    }

    fn finish(&mut self) {
        unsafe { self.gl.finish() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_and_barrier_bits() {
        assert_eq!(buffer_mask(BufferMask::DEPTH), glow::DEPTH_BUFFER_BIT);
        assert_eq!(
            buffer_mask(BufferMask::COLOR | BufferMask::STENCIL),
            glow::COLOR_BUFFER_BIT | glow::STENCIL_BUFFER_BIT
        );
        assert_eq!(
            barrier_bits(MemoryBarrier::ALL),
            glow::SHADER_IMAGE_ACCESS_BARRIER_BIT
                | glow::TEXTURE_FETCH_BARRIER_BIT
                | glow::TEXTURE_UPDATE_BARRIER_BIT
        );
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(internal_format(TextureFormat::Srgb8), glow::SRGB8);
        assert_eq!(internal_format(TextureFormat::Rg16F), glow::RG16F);
        assert_eq!(pixel_format(PixelFormat::Red), glow::RED);
        assert_eq!(filter(TextureFilter::LinearMipmapLinear), glow::LINEAR_MIPMAP_LINEAR as i32);
    }

    extern "system" fn stub_validate(_program: u32) {}

    extern "system" fn stub_get_program_iv(program: u32, pname: u32, params: *mut i32) {
        // Odd program names validate, even ones fail
        let status = i32::from(pname == glow::VALIDATE_STATUS && program % 2 == 1);
        unsafe { *params = status };
    }

    fn stub_loader(name: &str) -> *const c_void {
        match name {
            "glValidateProgram" => stub_validate as *const c_void,
            "glGetProgramiv" => stub_get_program_iv as *const c_void,
            _ => std::ptr::null(),
        }
    }

    #[test]
    fn test_validation_reads_validate_status() {
        let validation = ProgramValidation::load(stub_loader).unwrap();
        let valid = ProgramId::new(3).unwrap();
        let invalid = ProgramId::new(4).unwrap();

        assert!(unsafe { validation.validate(valid) });
        assert!(!unsafe { validation.validate(invalid) });
    }

    #[test]
    fn test_validation_requires_both_entry_points() {
        let missing_iv = ProgramValidation::load(|name| {
            if name == "glValidateProgram" {
                stub_validate as *const c_void
            } else {
                std::ptr::null()
            }
        });
        assert!(matches!(missing_iv, Err(RenderError::ContextCreation(_))));
    }

    #[test]
    fn test_stale_errors_are_drained_before_allocation() {
        let mut queue = vec![glow::NO_ERROR, glow::INVALID_VALUE, glow::INVALID_OPERATION];
        let dropped = drain_errors(|| queue.pop().unwrap_or(glow::NO_ERROR));
        assert_eq!(dropped, 2);
        assert!(queue.is_empty());

        // A flag raised by the allocation itself is what gets reported
        assert!(allocation_result("Texture storage", glow::NO_ERROR).is_ok());
        let error = allocation_result("Texture storage", glow::OUT_OF_MEMORY).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Resource allocation failed: Texture storage: out of memory"
        );
    }

    #[test]
    fn test_error_drain_is_bounded() {
        let dropped = drain_errors(|| glow::INVALID_ENUM);
        assert_eq!(dropped, MAX_PENDING_ERRORS);
    }
}
