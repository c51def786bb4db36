//! Headless recording device
//!
//! [`RecordingDevice`] implements [`GraphicsDevice`] without a GPU. It hands
//! out object names, records every command as a [`DeviceCall`], tracks which
//! objects are alive and evaluates framebuffer completeness from the
//! attachments it has seen. Compile, link, validate and storage failures
//! can be injected to exercise error paths.

use std::collections::{HashMap, HashSet};

use crate::render::device::{
    Attachment, BackendResult, BufferId, BufferMask, Capability, FramebufferId, FramebufferStatus,
    GraphicsDevice, ImageAccess, MemoryBarrier, PixelFormat, Primitive, ProgramId, RenderbufferId,
    ShaderId, ShaderStage, TexelData, TextureFilter, TextureFormat, TextureId, TextureTarget,
    UniformValue, VertexArrayId, VertexAttribute, Winding,
};
use crate::render::RenderError;

/// Element type of an uploaded pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelKind {
    /// 32-bit floats
    Float,
    /// Unsigned bytes
    Byte,
}

/// One recorded device command
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DeviceCall {
    CreateTexture { texture: TextureId, target: TextureTarget },
    TextureStorage { texture: TextureId, levels: u32, format: TextureFormat, width: u32, height: u32 },
    TextureSubImage {
        texture: TextureId,
        level: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        kind: TexelKind,
        len: usize,
    },
    TextureFilter { texture: TextureId, min: TextureFilter, mag: TextureFilter },
    GenerateMipmap(TextureId),
    DeleteTexture(TextureId),
    CreateRenderbuffer(RenderbufferId),
    RenderbufferStorage {
        renderbuffer: RenderbufferId,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    },
    DeleteRenderbuffer(RenderbufferId),
    CreateFramebuffer(FramebufferId),
    FramebufferTexture { framebuffer: FramebufferId, attachment: Attachment, texture: TextureId, level: u32 },
    FramebufferRenderbuffer { framebuffer: FramebufferId, attachment: Attachment, renderbuffer: RenderbufferId },
    CheckFramebufferStatus { framebuffer: FramebufferId, status: FramebufferStatus },
    BlitFramebuffer {
        src: FramebufferId,
        dst: FramebufferId,
        src_rect: [i32; 4],
        dst_rect: [i32; 4],
        mask: BufferMask,
        filter: TextureFilter,
    },
    InvalidateFramebuffer { framebuffer: FramebufferId, attachments: Vec<Attachment> },
    BindFramebuffer(Option<FramebufferId>),
    DeleteFramebuffer(FramebufferId),
    CreateBuffer { buffer: BufferId, size: usize },
    DeleteBuffer(BufferId),
    CreateVertexArray(VertexArrayId),
    VertexArrayElementBuffer { vertex_array: VertexArrayId, buffer: BufferId },
    VertexArrayAttribute { vertex_array: VertexArrayId, buffer: BufferId, attribute: VertexAttribute },
    DeleteVertexArray(VertexArrayId),
    CreateShader { shader: ShaderId, stage: ShaderStage },
    CompileShader { shader: ShaderId, success: bool },
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader { program: ProgramId, shader: ShaderId },
    DetachShader { program: ProgramId, shader: ShaderId },
    LinkProgram { program: ProgramId, success: bool },
    ValidateProgram { program: ProgramId, success: bool },
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    ProgramUniform { program: ProgramId, location: u32, value: UniformValue },
    BindTextureUnit { unit: u32, texture: TextureId },
    BindImageTexture {
        unit: u32,
        texture: TextureId,
        level: u32,
        layered: bool,
        access: ImageAccess,
        format: TextureFormat,
    },
    DispatchCompute([u32; 3]),
    MemoryBarrier(MemoryBarrier),
    Enable(Capability),
    Disable(Capability),
    FrontFace(Winding),
    Clear(BufferMask),
    BindVertexArray(VertexArrayId),
    DrawElements { primitive: Primitive, count: u32 },
    DrawArrays { primitive: Primitive, first: u32, count: u32 },
    Finish,
}

/// Count of live objects per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveObjects {
    /// Textures
    pub textures: usize,
    /// Renderbuffers
    pub renderbuffers: usize,
    /// Framebuffers
    pub framebuffers: usize,
    /// Buffers
    pub buffers: usize,
    /// Vertex arrays
    pub vertex_arrays: usize,
    /// Shader stages
    pub shaders: usize,
    /// Programs
    pub programs: usize,
}

impl LiveObjects {
    /// Sum over every kind
    pub fn total(&self) -> usize {
        self.textures
            + self.renderbuffers
            + self.framebuffers
            + self.buffers
            + self.vertex_arrays
            + self.shaders
            + self.programs
    }
}

/// Device that records commands instead of executing them
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    next_name: u32,

    textures: HashSet<TextureId>,
    allocated_textures: HashSet<TextureId>,
    renderbuffers: HashSet<RenderbufferId>,
    allocated_renderbuffers: HashSet<RenderbufferId>,
    framebuffers: HashMap<FramebufferId, Vec<FramebufferAttachment>>,
    buffers: HashSet<BufferId>,
    vertex_arrays: HashSet<VertexArrayId>,
    shaders: HashSet<ShaderId>,
    programs: HashSet<ProgramId>,

    shader_logs: HashMap<ShaderId, String>,
    program_logs: HashMap<ProgramId, String>,

    compile_failures: Vec<String>,
    fail_link: bool,
    fail_validate: bool,
    fail_storage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramebufferAttachment {
    Texture(Attachment, TextureId),
    Renderbuffer(Attachment, RenderbufferId),
}

impl RecordingDevice {
    /// Create a device with no objects
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail compilation of any source containing `pattern`
    #[must_use]
    pub fn fail_compile_containing(mut self, pattern: &str) -> Self {
        self.compile_failures.push(pattern.to_string());
        self
    }

    /// Fail every program link
    #[must_use]
    pub fn fail_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    /// Fail every program validation
    #[must_use]
    pub fn fail_validate(mut self) -> Self {
        self.fail_validate = true;
        self
    }

    /// Fail every texture and renderbuffer storage allocation
    #[must_use]
    pub fn fail_storage(mut self) -> Self {
        self.fail_storage = true;
        self
    }

    /// Every command recorded so far
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Drain the recorded commands
    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Live object counts
    pub fn live_objects(&self) -> LiveObjects {
        LiveObjects {
            textures: self.textures.len(),
            renderbuffers: self.renderbuffers.len(),
            framebuffers: self.framebuffers.len(),
            buffers: self.buffers.len(),
            vertex_arrays: self.vertex_arrays.len(),
            shaders: self.shaders.len(),
            programs: self.programs.len(),
        }
    }

    /// True when `texture` exists and has not been deleted
    pub fn is_texture_live(&self, texture: TextureId) -> bool {
        self.textures.contains(&texture)
    }

    /// True when `program` exists and has not been deleted
    pub fn is_program_live(&self, program: ProgramId) -> bool {
        self.programs.contains(&program)
    }

    fn next_raw(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn record(&mut self, call: DeviceCall) {
        self.calls.push(call);
    }

    fn allocation_result(&self, what: &str) -> BackendResult<()> {
        if self.fail_storage {
            Err(RenderError::ResourceAllocation(format!("{what} storage allocation failed (GL_OUT_OF_MEMORY)")))
        } else {
            Ok(())
        }
    }

    fn attach(&mut self, framebuffer: FramebufferId, attachment: FramebufferAttachment) {
        if let Some(list) = self.framebuffers.get_mut(&framebuffer) {
            list.retain(|existing| point_of(*existing) != point_of(attachment));
            list.push(attachment);
        }
    }

    fn evaluate_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(attachments) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::INCOMPLETE_MISSING_ATTACHMENT;
        };
        if attachments.is_empty() {
            return FramebufferStatus::INCOMPLETE_MISSING_ATTACHMENT;
        }
        let all_allocated = attachments.iter().all(|attachment| match attachment {
            FramebufferAttachment::Texture(_, texture) => self.allocated_textures.contains(texture),
            FramebufferAttachment::Renderbuffer(_, renderbuffer) => {
                self.allocated_renderbuffers.contains(renderbuffer)
            }
        });
        if all_allocated {
            FramebufferStatus::COMPLETE
        } else {
            FramebufferStatus::INCOMPLETE_ATTACHMENT
        }
    }
}

fn point_of(attachment: FramebufferAttachment) -> Attachment {
    match attachment {
        FramebufferAttachment::Texture(point, _) | FramebufferAttachment::Renderbuffer(point, _) => point,
    }
}

macro_rules! new_name {
    ($self:ident, $ty:ident) => {
        $ty::new($self.next_raw())
            .ok_or_else(|| RenderError::ResourceAllocation("object names exhausted".to_string()))?
    };
}

impl GraphicsDevice for RecordingDevice {
    fn create_texture(&mut self, target: TextureTarget) -> BackendResult<TextureId> {
        let texture = new_name!(self, TextureId);
        self.textures.insert(texture);
        self.record(DeviceCall::CreateTexture { texture, target });
        Ok(texture)
    }

    fn texture_storage(
        &mut self,
        texture: TextureId,
        levels: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        self.record(DeviceCall::TextureStorage { texture, levels, format, width, height });
        self.allocation_result("Texture")?;
        self.allocated_textures.insert(texture);
        Ok(())
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
        let (kind, len) = match data {
            TexelData::Float(values) => (TexelKind::Float, values.len()),
            TexelData::Byte(values) => (TexelKind::Byte, values.len()),
        };
        self.record(DeviceCall::TextureSubImage { texture, level, width, height, format, kind, len });
    }

    fn texture_filter(&mut self, texture: TextureId, min: TextureFilter, mag: TextureFilter) {
        self.record(DeviceCall::TextureFilter { texture, min, mag });
    }

    fn generate_mipmap(&mut self, texture: TextureId) {
        self.record(DeviceCall::GenerateMipmap(texture));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.allocated_textures.remove(&texture);
        self.record(DeviceCall::DeleteTexture(texture));
    }

    fn create_renderbuffer(&mut self) -> BackendResult<RenderbufferId> {
        let renderbuffer = new_name!(self, RenderbufferId);
        self.renderbuffers.insert(renderbuffer);
        self.record(DeviceCall::CreateRenderbuffer(renderbuffer));
        Ok(renderbuffer)
    }

    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        self.record(DeviceCall::RenderbufferStorage { renderbuffer, samples, format, width, height });
        self.allocation_result("Renderbuffer")?;
        self.allocated_renderbuffers.insert(renderbuffer);
        Ok(())
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.renderbuffers.remove(&renderbuffer);
        self.allocated_renderbuffers.remove(&renderbuffer);
        self.record(DeviceCall::DeleteRenderbuffer(renderbuffer));
    }

    fn create_framebuffer(&mut self) -> BackendResult<FramebufferId> {
        let framebuffer = new_name!(self, FramebufferId);
        self.framebuffers.insert(framebuffer, Vec::new());
        self.record(DeviceCall::CreateFramebuffer(framebuffer));
        Ok(framebuffer)
    }

    fn framebuffer_texture(
        &mut self,
        framebuffer: FramebufferId,
        attachment: Attachment,
        texture: TextureId,
        level: u32,
    ) {
        self.attach(framebuffer, FramebufferAttachment::Texture(attachment, texture));
        self.record(DeviceCall::FramebufferTexture { framebuffer, attachment, texture, level });
    }

    fn framebuffer_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        attachment: Attachment,
        renderbuffer: RenderbufferId,
    ) {
        self.attach(framebuffer, FramebufferAttachment::Renderbuffer(attachment, renderbuffer));
        self.record(DeviceCall::FramebufferRenderbuffer { framebuffer, attachment, renderbuffer });
    }

    fn check_framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus {
        let status = self.evaluate_status(framebuffer);
        self.record(DeviceCall::CheckFramebufferStatus { framebuffer, status });
        status
    }

    fn blit_framebuffer(
        &mut self,
        src: FramebufferId,
        dst: FramebufferId,
        src_rect: [i32; 4],
        dst_rect: [i32; 4],
        mask: BufferMask,
        filter: TextureFilter,
    ) {
        self.record(DeviceCall::BlitFramebuffer { src, dst, src_rect, dst_rect, mask, filter });
    }

    fn invalidate_framebuffer(&mut self, framebuffer: FramebufferId, attachments: &[Attachment]) {
        self.record(DeviceCall::InvalidateFramebuffer {
            framebuffer,
            attachments: attachments.to_vec(),
        });
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.record(DeviceCall::BindFramebuffer(framebuffer));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer);
        self.record(DeviceCall::DeleteFramebuffer(framebuffer));
    }

    fn create_buffer(&mut self, data: &[u8]) -> BackendResult<BufferId> {
        let buffer = new_name!(self, BufferId);
        self.buffers.insert(buffer);
        self.record(DeviceCall::CreateBuffer { buffer, size: data.len() });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.record(DeviceCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayId> {
        let vertex_array = new_name!(self, VertexArrayId);
        self.vertex_arrays.insert(vertex_array);
        self.record(DeviceCall::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn vertex_array_element_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) {
        self.record(DeviceCall::VertexArrayElementBuffer { vertex_array, buffer });
    }

    fn vertex_array_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        buffer: BufferId,
        attribute: VertexAttribute,
    ) {
        self.record(DeviceCall::VertexArrayAttribute { vertex_array, buffer, attribute });
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        self.record(DeviceCall::DeleteVertexArray(vertex_array));
    }

    fn create_shader(&mut self, stage: ShaderStage) -> BackendResult<ShaderId> {
        let shader = new_name!(self, ShaderId);
        self.shaders.insert(shader);
        self.record(DeviceCall::CreateShader { shader, stage });
        Ok(shader)
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> bool {
        let failure = self
            .compile_failures
            .iter()
            .find(|pattern| source.contains(pattern.as_str()))
            .cloned();
        let success = failure.is_none();
        if let Some(pattern) = failure {
            self.shader_logs
                .insert(shader, format!("0:1(1): error: syntax error near '{pattern}'"));
        }
        self.record(DeviceCall::CompileShader { shader, success });
        success
    }

    fn shader_info_log(&mut self, shader: ShaderId) -> String {
        self.shader_logs.get(&shader).cloned().unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
        self.shader_logs.remove(&shader);
        self.record(DeviceCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> BackendResult<ProgramId> {
        let program = new_name!(self, ProgramId);
        self.programs.insert(program);
        self.record(DeviceCall::CreateProgram(program));
        Ok(program)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.record(DeviceCall::AttachShader { program, shader });
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.record(DeviceCall::DetachShader { program, shader });
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        let success = !self.fail_link;
        if !success {
            self.program_logs
                .insert(program, "error: unresolved symbol 'main'".to_string());
        }
        self.record(DeviceCall::LinkProgram { program, success });
        success
    }

    fn validate_program(&mut self, program: ProgramId) -> bool {
        let success = !self.fail_validate;
        if !success {
            self.program_logs
                .insert(program, "validation: sampler units conflict".to_string());
        }
        self.record(DeviceCall::ValidateProgram { program, success });
        success
    }

    fn program_info_log(&mut self, program: ProgramId) -> String {
        self.program_logs.get(&program).cloned().unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.program_logs.remove(&program);
        self.record(DeviceCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(DeviceCall::UseProgram(program));
    }

    fn program_uniform(&mut self, program: ProgramId, location: u32, value: UniformValue) {
        self.record(DeviceCall::ProgramUniform { program, location, value });
    }

    fn bind_texture_unit(&mut self, unit: u32, texture: TextureId) {
        self.record(DeviceCall::BindTextureUnit { unit, texture });
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
        self.record(DeviceCall::BindImageTexture { unit, texture, level, layered, access, format });
    }

    fn dispatch_compute(&mut self, groups: [u32; 3]) {
        self.record(DeviceCall::DispatchCompute(groups));
    }

    fn memory_barrier(&mut self, barriers: MemoryBarrier) {
        self.record(DeviceCall::MemoryBarrier(barriers));
    }

    fn enable(&mut self, capability: Capability) {
        self.record(DeviceCall::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.record(DeviceCall::Disable(capability));
    }

    fn front_face(&mut self, winding: Winding) {
        self.record(DeviceCall::FrontFace(winding));
    }

    fn clear(&mut self, mask: BufferMask) {
        self.record(DeviceCall::Clear(mask));
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.record(DeviceCall::BindVertexArray(vertex_array));
    }

    fn draw_elements(&mut self, primitive: Primitive, count: u32) {
        self.record(DeviceCall::DrawElements { primitive, count });
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        self.record(DeviceCall::DrawArrays { primitive, first, count });
    }

    fn finish(&mut self) {
        self.record(DeviceCall::Finish);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_tracked() {
        let mut device = RecordingDevice::new();
        let a = device.create_texture(TextureTarget::Texture2D).unwrap();
        let b = device.create_texture(TextureTarget::CubeMap).unwrap();
        assert_ne!(a, b);
        assert_eq!(device.live_objects().textures, 2);

        device.delete_texture(a);
        assert!(!device.is_texture_live(a));
        assert_eq!(device.live_objects().total(), 1);
    }

    #[test]
    fn test_completeness_needs_allocated_attachment() {
        let mut device = RecordingDevice::new();
        let fb = device.create_framebuffer().unwrap();
        assert_eq!(device.check_framebuffer_status(fb), FramebufferStatus::INCOMPLETE_MISSING_ATTACHMENT);

        let rb = device.create_renderbuffer().unwrap();
        device.framebuffer_renderbuffer(fb, Attachment::DepthStencil, rb);
        assert_eq!(device.check_framebuffer_status(fb), FramebufferStatus::INCOMPLETE_ATTACHMENT);

        device
            .renderbuffer_storage(rb, 0, TextureFormat::Depth24Stencil8, 4, 4)
            .unwrap();
        assert!(device.check_framebuffer_status(fb).is_complete());
    }

    #[test]
    fn test_injected_compile_failure_has_log() {
        let mut device = RecordingDevice::new().fail_compile_containing("#error");
        let shader = device.create_shader(ShaderStage::Fragment).unwrap();
        assert!(!device.compile_shader(shader, "#version 450\n#error\n"));
        assert!(device.shader_info_log(shader).contains("#error"));

        let other = device.create_shader(ShaderStage::Vertex).unwrap();
        assert!(device.compile_shader(other, "#version 450\nvoid main() {}"));
        assert!(device.shader_info_log(other).is_empty());
    }
}
