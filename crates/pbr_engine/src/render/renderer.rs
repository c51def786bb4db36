//! Renderer facade
//!
//! Owns the device and every GPU resource for the lifetime of the viewer.
//! Resources are created by [`Renderer::initialize`] and [`Renderer::setup`]
//! and released exactly once, either by [`Renderer::shutdown`] or on drop.

use crate::assets::AssetSource;
use crate::config::AssetPaths;
use crate::render::device::{
    BackendResult, Capability, GraphicsDevice, PixelFormat, TextureFormat, Winding,
};
use crate::render::environment::{precompute_environment, EnvironmentMaps};
use crate::render::factory::{MipLevels, ResourceFactory};
use crate::render::frame::{
    render_frame, FrameResources, FrameSurface, FrameTransforms, MaterialTextures, ViewSettings,
};
use crate::render::program::{
    release_program, PbrProgram, ProgramBuilder, SkyboxProgram, TonemapProgram,
};
use crate::render::resources::{FrameBuffer, VertexBuffer};

/// Color format of the HDR scene targets
pub const SCENE_COLOR_FORMAT: TextureFormat = TextureFormat::Rgba16F;
/// Depth/stencil format of the main target
pub const SCENE_DEPTH_STENCIL_FORMAT: TextureFormat = TextureFormat::Depth24Stencil8;

/// The PBR renderer
pub struct Renderer<D: GraphicsDevice> {
    device: D,
    framebuffer: FrameBuffer,
    /// Separate single-sample target, only when the main one is multisampled
    resolve_framebuffer: Option<FrameBuffer>,

    screen_quad: VertexBuffer,
    skybox: VertexBuffer,
    model: VertexBuffer,

    tonemap_program: TonemapProgram,
    skybox_program: SkyboxProgram,
    pbr_program: PbrProgram,

    material: MaterialTextures,
    environment: EnvironmentMaps,
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Take ownership of a ready device and create the scene framebuffers
    ///
    /// With `samples > 0` the main target is multisampled and a separate
    /// resolve target is created; otherwise the main target is resolved
    /// in place.
    pub fn initialize(device: D, width: u32, height: u32, samples: u32) -> BackendResult<Self> {
        let mut renderer = Self {
            device,
            framebuffer: FrameBuffer::default(),
            resolve_framebuffer: None,
            screen_quad: VertexBuffer::default(),
            skybox: VertexBuffer::default(),
            model: VertexBuffer::default(),
            tonemap_program: TonemapProgram::default(),
            skybox_program: SkyboxProgram::default(),
            pbr_program: PbrProgram::default(),
            material: MaterialTextures::default(),
            environment: EnvironmentMaps::default(),
        };

        let mut factory = ResourceFactory::new(&mut renderer.device);
        renderer.framebuffer = factory.create_framebuffer(
            width,
            height,
            samples,
            Some(SCENE_COLOR_FORMAT),
            Some(SCENE_DEPTH_STENCIL_FORMAT),
        )?;
        if samples > 0 {
            renderer.resolve_framebuffer = Some(factory.create_framebuffer(
                width,
                height,
                0,
                Some(SCENE_COLOR_FORMAT),
                None,
            )?);
        }

        log::info!("Renderer initialized: {}x{}, {} samples", width, height, samples);
        Ok(renderer)
    }

    /// Load the scene, build every program and precompute lighting
    ///
    /// Anything left from a previous setup is released first. On error the
    /// resources built so far stay owned by the renderer and are released
    /// by [`Renderer::shutdown`] or on drop.
    pub fn setup(&mut self, assets: &dyn AssetSource, paths: &AssetPaths) -> BackendResult<()> {
        self.release_scene();

        self.device.enable(Capability::CullFace);
        self.device.enable(Capability::TextureCubeMapSeamless);
        self.device.front_face(Winding::CounterClockwise);

        self.screen_quad = ResourceFactory::new(&mut self.device).create_clip_space_quad()?;
        self.tonemap_program =
            TonemapProgram::build(&mut ProgramBuilder::new(&mut self.device, assets), paths)?;

        let skybox_mesh = assets.load_mesh(&paths.skybox_mesh)?;
        self.skybox = ResourceFactory::new(&mut self.device).create_vertex_buffer(&skybox_mesh)?;
        self.skybox_program =
            SkyboxProgram::build(&mut ProgramBuilder::new(&mut self.device, assets), paths)?;

        let model_mesh = assets.load_mesh(&paths.model_mesh)?;
        self.model = ResourceFactory::new(&mut self.device).create_vertex_buffer(&model_mesh)?;
        self.pbr_program =
            PbrProgram::build(&mut ProgramBuilder::new(&mut self.device, assets), paths)?;

        self.load_material(assets, paths)?;
        precompute_environment(&mut self.device, assets, paths, &mut self.environment)?;

        log::info!("Renderer setup complete");
        Ok(())
    }

    fn load_material(&mut self, assets: &dyn AssetSource, paths: &AssetPaths) -> BackendResult<()> {
        let maps = [
            (&paths.albedo, PixelFormat::Rgb, TextureFormat::Srgb8),
            (&paths.normal, PixelFormat::Rgb, TextureFormat::Rgb8),
            (&paths.metalness, PixelFormat::Red, TextureFormat::R8),
            (&paths.roughness, PixelFormat::Red, TextureFormat::R8),
        ];
        let material = &mut self.material;
        let slots = [
            &mut material.albedo,
            &mut material.normal,
            &mut material.metalness,
            &mut material.roughness,
        ];

        for ((path, format, internal_format), slot) in maps.into_iter().zip(slots) {
            let image = assets.load_image(path, format.channels())?;
            *slot = ResourceFactory::new(&mut self.device).create_texture_from_image(
                &image,
                format,
                internal_format,
                MipLevels::Full,
            )?;
        }
        Ok(())
    }

    /// Draw one frame and present it to `surface`
    pub fn render(&mut self, surface: &mut dyn FrameSurface, settings: &ViewSettings) -> FrameTransforms {
        let resources = FrameResources {
            framebuffer: &self.framebuffer,
            resolve_framebuffer: self.resolve_framebuffer.as_ref().unwrap_or(&self.framebuffer),
            skybox: &self.skybox,
            skybox_program: &self.skybox_program,
            model: &self.model,
            pbr_program: &self.pbr_program,
            material: &self.material,
            environment: &self.environment,
            screen_quad: &self.screen_quad,
            tonemap_program: &self.tonemap_program,
        };
        let transforms = render_frame(&mut self.device, &resources, settings);
        surface.present();
        transforms
    }

    fn release_scene(&mut self) {
        let device = &mut self.device;

        self.environment.release(device);
        self.material.release(device);

        release_program(device, &mut self.pbr_program);
        release_program(device, &mut self.skybox_program);
        release_program(device, &mut self.tonemap_program);

        let mut factory = ResourceFactory::new(device);
        factory.delete_vertex_buffer(&mut self.model);
        factory.delete_vertex_buffer(&mut self.skybox);
        factory.delete_vertex_buffer(&mut self.screen_quad);
    }

    /// Release every resource; calling it again does nothing
    pub fn shutdown(&mut self) {
        self.release_scene();

        let mut factory = ResourceFactory::new(&mut self.device);
        if let Some(mut resolve) = self.resolve_framebuffer.take() {
            factory.delete_framebuffer(&mut resolve);
        }
        factory.delete_framebuffer(&mut self.framebuffer);
    }

    /// The underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The underlying device, mutably
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Main render target
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    /// Target resolved into before tonemapping
    pub fn resolve_framebuffer(&self) -> &FrameBuffer {
        self.resolve_framebuffer.as_ref().unwrap_or(&self.framebuffer)
    }

    /// Precomputed lighting textures
    pub fn environment(&self) -> &EnvironmentMaps {
        &self.environment
    }

    /// Model material textures
    pub fn material(&self) -> &MaterialTextures {
        &self.material
    }
}

impl<D: GraphicsDevice> Drop for Renderer<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
