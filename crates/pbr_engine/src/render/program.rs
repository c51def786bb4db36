//! Shader programs
//!
//! [`ProgramBuilder`] compiles GLSL stages read through an [`AssetSource`]
//! and links them into programs. Uniforms are typed slots owned by the
//! struct of the program that declares them, so a location can only be
//! written through the program it belongs to.

use std::marker::PhantomData;

use crate::assets::AssetSource;
use crate::config::AssetPaths;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::device::{
    BackendResult, GraphicsDevice, ShaderId, ShaderStage, UniformValue,
};
use crate::render::resources::ShaderProgram;
use crate::render::RenderError;

/// File names of the shader set, relative to the shader directory
pub mod shader_files {
    /// Full-screen quad vertex shader
    pub const PASSTHROUGH_VS: &str = "passthrough_vs.glsl";
    /// Tonemapping fragment shader
    pub const TONEMAP_FS: &str = "tonemap_fs.glsl";
    /// Skybox vertex shader
    pub const SKYBOX_VS: &str = "skybox_vs.glsl";
    /// Skybox fragment shader
    pub const SKYBOX_FS: &str = "skybox_fs.glsl";
    /// PBR model vertex shader
    pub const PBR_VS: &str = "pbr_vs.glsl";
    /// PBR model fragment shader
    pub const PBR_FS: &str = "pbr_fs.glsl";
    /// Equirectangular to cubemap projection
    pub const EQUIRECT_TO_CUBE_CS: &str = "equirect2cube_cs.glsl";
    /// Diffuse irradiance convolution
    pub const IRRADIANCE_CS: &str = "irmap_cs.glsl";
    /// Specular environment pre-filter
    pub const SPECULAR_MAP_CS: &str = "spmap_cs.glsl";
    /// Split-sum BRDF lookup table
    pub const SPECULAR_BRDF_CS: &str = "spbrdf_cs.glsl";
}

/// Compiled stage awaiting linking
///
/// Not `Clone`: linking consumes the stage and deletes it.
#[derive(Debug, PartialEq, Eq)]
pub struct CompiledShader {
    id: ShaderId,
    stage: ShaderStage,
}

impl CompiledShader {
    /// Backend name
    pub fn id(&self) -> ShaderId {
        self.id
    }

    /// Stage kind
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

/// Value type that can be written to a uniform
pub trait UniformType {
    /// Convert into the device representation
    fn to_uniform(&self) -> UniformValue;
}

impl UniformType for f32 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Float(*self)
    }
}

impl UniformType for Vec3 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec3([self.x, self.y, self.z])
    }
}

impl UniformType for Mat4 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Mat4(self.to_column_array())
    }
}

/// Typed uniform location of one program
pub struct Uniform<T> {
    location: u32,
    _value: PhantomData<fn(T)>,
}

impl<T> Clone for Uniform<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Uniform<T> {}

impl<T> std::fmt::Debug for Uniform<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uniform").field("location", &self.location).finish()
    }
}

impl<T: UniformType> Uniform<T> {
    const fn at(location: u32) -> Self {
        Self { location, _value: PhantomData }
    }

    /// Shader-side `layout(location = N)`
    pub fn location(self) -> u32 {
        self.location
    }

    fn set<D: GraphicsDevice + ?Sized>(self, device: &mut D, program: &ShaderProgram, value: &T) {
        if let Some(id) = program.id {
            device.program_uniform(id, self.location, value.to_uniform());
        }
    }
}

/// Anything that owns exactly one linked program
pub trait ProgramHandle {
    /// The owned program
    fn program(&self) -> &ShaderProgram;

    /// The owned program, mutably for release
    fn program_mut(&mut self) -> &mut ShaderProgram;

    /// Make the program current
    fn bind<D: GraphicsDevice + ?Sized>(&self, device: &mut D) {
        if let Some(id) = self.program().id {
            device.use_program(id);
        }
    }
}

impl ProgramHandle for ShaderProgram {
    fn program(&self) -> &ShaderProgram {
        self
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        self
    }
}

/// Compiles and links shader programs on a device
pub struct ProgramBuilder<'a, D: GraphicsDevice + ?Sized> {
    device: &'a mut D,
    assets: &'a dyn AssetSource,
}

impl<'a, D: GraphicsDevice + ?Sized> ProgramBuilder<'a, D> {
    /// Borrow a device and the source of shader text
    pub fn new(device: &'a mut D, assets: &'a dyn AssetSource) -> Self {
        Self { device, assets }
    }

    /// Compile one stage from a source file
    pub fn compile_shader(&mut self, path: &str, stage: ShaderStage) -> BackendResult<CompiledShader> {
        let source = self.assets.read_text(path);
        if source.is_empty() {
            return Err(RenderError::ShaderSourceUnreadable { path: path.to_string() });
        }

        log::info!("Compiling GLSL shader: {}", path);

        let id = self.device.create_shader(stage)?;
        if !self.device.compile_shader(id, &source) {
            let log = self.device.shader_info_log(id);
            self.device.delete_shader(id);
            return Err(RenderError::ShaderCompilation { path: path.to_string(), log });
        }
        Ok(CompiledShader { id, stage })
    }

    /// Link stages into a validated program
    ///
    /// The stages are detached and deleted whether or not linking succeeds.
    pub fn link_program(&mut self, stages: Vec<CompiledShader>) -> BackendResult<ShaderProgram> {
        let program = match self.device.create_program() {
            Ok(program) => program,
            Err(e) => {
                self.delete_stages(stages);
                return Err(e);
            }
        };

        for stage in &stages {
            self.device.attach_shader(program, stage.id);
        }
        let linked = self.device.link_program(program);
        for stage in &stages {
            self.device.detach_shader(program, stage.id);
        }
        self.delete_stages(stages);

        let usable = linked && self.device.validate_program(program);
        if !usable {
            let log = self.device.program_info_log(program);
            self.device.delete_program(program);
            return Err(RenderError::ProgramLink { log });
        }

        log::debug!("Linked program {}", program.get());
        Ok(ShaderProgram { id: Some(program) })
    }

    /// Compile every `(path, stage)` pair and link the result
    ///
    /// Stages compiled before a failing one are deleted.
    pub fn build_program(&mut self, sources: &[(String, ShaderStage)]) -> BackendResult<ShaderProgram> {
        let mut stages = Vec::with_capacity(sources.len());
        for (path, stage) in sources {
            match self.compile_shader(path, *stage) {
                Ok(compiled) => stages.push(compiled),
                Err(e) => {
                    self.delete_stages(stages);
                    return Err(e);
                }
            }
        }
        self.link_program(stages)
    }

    /// Release a program and reset the handle
    pub fn delete_program<P: ProgramHandle + ?Sized>(&mut self, program: &mut P) {
        release_program(&mut *self.device, program);
    }

    fn delete_stages(&mut self, stages: Vec<CompiledShader>) {
        for stage in stages {
            self.device.delete_shader(stage.id);
        }
    }
}

/// Release a program on `device` and reset the handle
pub fn release_program<D, P>(device: &mut D, program: &mut P)
where
    D: GraphicsDevice + ?Sized,
    P: ProgramHandle + ?Sized,
{
    let program = std::mem::take(program.program_mut());
    if let Some(id) = program.id {
        device.delete_program(id);
    }
}

/// Run `scope` with a program that is released afterwards, whatever the outcome
pub fn with_transient_program<D, P, T, F>(device: &mut D, mut program: P, scope: F) -> BackendResult<T>
where
    D: GraphicsDevice + ?Sized,
    P: ProgramHandle,
    F: FnOnce(&mut D, &P) -> BackendResult<T>,
{
    let result = scope(&mut *device, &program);
    release_program(device, &mut program);
    result
}

fn vertex_fragment(paths: &AssetPaths, vs: &str, fs: &str) -> [(String, ShaderStage); 2] {
    [
        (paths.shader(vs), ShaderStage::Vertex),
        (paths.shader(fs), ShaderStage::Fragment),
    ]
}

/// Build a single-stage compute program from the shader directory
pub fn build_compute_program<D: GraphicsDevice + ?Sized>(
    builder: &mut ProgramBuilder<'_, D>,
    paths: &AssetPaths,
    file: &str,
) -> BackendResult<ShaderProgram> {
    builder.build_program(&[(paths.shader(file), ShaderStage::Compute)])
}

/// Full-screen tonemapping program
#[derive(Debug, Default)]
pub struct TonemapProgram {
    program: ShaderProgram,
}

impl TonemapProgram {
    /// Compile and link from the shader set
    pub fn build<D: GraphicsDevice + ?Sized>(
        builder: &mut ProgramBuilder<'_, D>,
        paths: &AssetPaths,
    ) -> BackendResult<Self> {
        let sources = vertex_fragment(paths, shader_files::PASSTHROUGH_VS, shader_files::TONEMAP_FS);
        Ok(Self { program: builder.build_program(&sources)? })
    }
}

impl ProgramHandle for TonemapProgram {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }
}

/// Skybox program, driven by a rotation-only view-projection
#[derive(Debug)]
pub struct SkyboxProgram {
    program: ShaderProgram,
    view_projection: Uniform<Mat4>,
}

impl Default for SkyboxProgram {
    fn default() -> Self {
        Self { program: ShaderProgram::default(), view_projection: Uniform::at(0) }
    }
}

impl SkyboxProgram {
    /// Compile and link from the shader set
    pub fn build<D: GraphicsDevice + ?Sized>(
        builder: &mut ProgramBuilder<'_, D>,
        paths: &AssetPaths,
    ) -> BackendResult<Self> {
        let sources = vertex_fragment(paths, shader_files::SKYBOX_VS, shader_files::SKYBOX_FS);
        Ok(Self { program: builder.build_program(&sources)?, ..Self::default() })
    }

    /// Projection times camera rotation
    pub fn set_view_projection<D: GraphicsDevice + ?Sized>(&self, device: &mut D, value: &Mat4) {
        self.view_projection.set(device, &self.program, value);
    }

    /// The view-projection slot
    pub fn view_projection(&self) -> Uniform<Mat4> {
        self.view_projection
    }
}

impl ProgramHandle for SkyboxProgram {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }
}

/// Image-based-lighting model program
#[derive(Debug)]
pub struct PbrProgram {
    program: ShaderProgram,
    view_projection: Uniform<Mat4>,
    eye_position: Uniform<Vec3>,
}

impl Default for PbrProgram {
    fn default() -> Self {
        Self {
            program: ShaderProgram::default(),
            view_projection: Uniform::at(0),
            eye_position: Uniform::at(1),
        }
    }
}

impl PbrProgram {
    /// Compile and link from the shader set
    pub fn build<D: GraphicsDevice + ?Sized>(
        builder: &mut ProgramBuilder<'_, D>,
        paths: &AssetPaths,
    ) -> BackendResult<Self> {
        let sources = vertex_fragment(paths, shader_files::PBR_VS, shader_files::PBR_FS);
        Ok(Self { program: builder.build_program(&sources)?, ..Self::default() })
    }

    /// Projection times full view transform
    pub fn set_view_projection<D: GraphicsDevice + ?Sized>(&self, device: &mut D, value: &Mat4) {
        self.view_projection.set(device, &self.program, value);
    }

    /// World-space camera position
    pub fn set_eye_position<D: GraphicsDevice + ?Sized>(&self, device: &mut D, value: &Vec3) {
        self.eye_position.set(device, &self.program, value);
    }

    /// The view-projection slot
    pub fn view_projection(&self) -> Uniform<Mat4> {
        self.view_projection
    }

    /// The eye position slot
    pub fn eye_position(&self) -> Uniform<Vec3> {
        self.eye_position
    }
}

impl ProgramHandle for PbrProgram {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }
}

/// Specular pre-filter compute program
#[derive(Debug)]
pub struct SpecularFilterProgram {
    program: ShaderProgram,
    roughness: Uniform<f32>,
}

impl Default for SpecularFilterProgram {
    fn default() -> Self {
        Self { program: ShaderProgram::default(), roughness: Uniform::at(0) }
    }
}

impl SpecularFilterProgram {
    /// Compile and link from the shader set
    pub fn build<D: GraphicsDevice + ?Sized>(
        builder: &mut ProgramBuilder<'_, D>,
        paths: &AssetPaths,
    ) -> BackendResult<Self> {
        let program = build_compute_program(builder, paths, shader_files::SPECULAR_MAP_CS)?;
        Ok(Self { program, ..Self::default() })
    }

    /// Roughness of the mip level about to be dispatched
    pub fn set_roughness<D: GraphicsDevice + ?Sized>(&self, device: &mut D, value: f32) {
        self.roughness.set(device, &self.program, &value);
    }

    /// The roughness slot
    pub fn roughness(&self) -> Uniform<f32> {
        self.roughness
    }
}

impl ProgramHandle for SpecularFilterProgram {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }
}
