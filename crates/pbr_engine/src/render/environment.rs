//! Image-based lighting precomputation
//!
//! Turns an equirectangular HDR panorama into the four textures the PBR
//! shader samples: the environment cubemap, its diffuse irradiance map, the
//! roughness-indexed specular mip chain and the split-sum BRDF table. Each
//! stage runs a one-shot compute program that is released right after its
//! dispatches, and ends with a memory barrier so the next consumer sees the
//! written texels.
//!
//! The module also carries a CPU model of the cube projection shader, used
//! to check projected texels against the source panorama.

use crate::assets::{AssetSource, ImageData};
use crate::config::AssetPaths;
use crate::foundation::math::{constants, Vec2, Vec3};
use crate::render::device::{
    BackendResult, GraphicsDevice, ImageAccess, MemoryBarrier, PixelFormat, TextureFormat,
    TextureId, TextureTarget,
};
use crate::render::factory::{with_transient_texture, MipLevels, ResourceFactory};
use crate::render::program::{
    build_compute_program, shader_files, with_transient_program, ProgramBuilder, ProgramHandle,
    SpecularFilterProgram,
};
use crate::render::resources::Texture;
use crate::render::RenderError;

/// Edge length of the environment and specular cubemaps
pub const ENVIRONMENT_SIZE: u32 = 1024;
/// Edge length of the irradiance cubemap
pub const IRRADIANCE_SIZE: u32 = 32;
/// Edge length of the BRDF lookup table
pub const BRDF_LUT_SIZE: u32 = 256;
/// Local work group edge of every precompute shader
pub const WORK_GROUP_SIZE: u32 = 32;

const CUBE_FACES: u32 = 6;

/// Barrier issued after each stage, before its output is sampled or mip-mapped
pub const PRECOMPUTE_BARRIER: MemoryBarrier = MemoryBarrier::TEXTURE_FETCH
    .union(MemoryBarrier::TEXTURE_UPDATE)
    .union(MemoryBarrier::SHADER_IMAGE_ACCESS);

/// Lighting textures produced by [`precompute_environment`]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnvironmentMaps {
    /// Environment cubemap with a full mip chain
    pub environment: Texture,
    /// Diffuse irradiance cubemap, single level
    pub irradiance: Texture,
    /// Pre-filtered specular cubemap, one roughness per mip level
    pub specular: Texture,
    /// Split-sum BRDF table (scale, bias)
    pub brdf_lut: Texture,
}

impl EnvironmentMaps {
    /// Release every texture and reset the handles
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        let mut factory = ResourceFactory::new(device);
        factory.delete_texture(&mut self.environment);
        factory.delete_texture(&mut self.irradiance);
        factory.delete_texture(&mut self.specular);
        factory.delete_texture(&mut self.brdf_lut);
    }
}

/// Roughness step between consecutive specular mip levels
///
/// Level `L` is filtered for roughness `L * delta`, reaching 1.0 on the last
/// valid level. A single-level map gets a delta of 0.
pub fn roughness_delta(levels: u32) -> f32 {
    if levels > 1 {
        1.0 / (levels - 1) as f32
    } else {
        0.0
    }
}

/// Work groups per axis for specular mip level `level`
pub fn specular_dispatch_groups(level: u32) -> u32 {
    ENVIRONMENT_SIZE
        .checked_shr(level)
        .map_or(0, |size| size / WORK_GROUP_SIZE)
        .max(1)
}

fn backend_name(texture: &Texture) -> BackendResult<TextureId> {
    texture
        .id()
        .ok_or_else(|| RenderError::ResourceAllocation("texture has no backend name".to_string()))
}

/// Run every precompute stage, storing results in `maps` as they are created
///
/// On error, textures already stored in `maps` stay there for the owner to
/// release; transient programs and the panorama texture are released here.
pub fn precompute_environment<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    assets: &dyn AssetSource,
    paths: &AssetPaths,
    maps: &mut EnvironmentMaps,
) -> BackendResult<()> {
    project_equirect_to_cube(device, assets, paths, maps)?;
    convolve_irradiance(device, assets, paths, maps)?;
    prefilter_specular(device, assets, paths, maps)?;
    integrate_brdf(device, assets, paths, maps)?;

    device.finish();
    log::info!("Environment precomputation complete");
    Ok(())
}

fn project_equirect_to_cube<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    assets: &dyn AssetSource,
    paths: &AssetPaths,
    maps: &mut EnvironmentMaps,
) -> BackendResult<()> {
    log::info!("Projecting {} onto environment cubemap", paths.environment);

    let program = build_compute_program(
        &mut ProgramBuilder::new(device, assets),
        paths,
        shader_files::EQUIRECT_TO_CUBE_CS,
    )?;

    with_transient_program(device, program, |device, program| {
        let image = assets.load_image(&paths.environment, 3)?;
        let equirect = ResourceFactory::new(device).create_texture_from_image(
            &image,
            PixelFormat::Rgb,
            TextureFormat::Rgb16F,
            MipLevels::Exact(1),
        )?;

        with_transient_texture(device, equirect, |device, equirect| {
            maps.environment = ResourceFactory::new(device).create_texture(
                TextureTarget::CubeMap,
                ENVIRONMENT_SIZE,
                ENVIRONMENT_SIZE,
                TextureFormat::Rgba16F,
                MipLevels::Full,
            )?;
            let environment = backend_name(&maps.environment)?;

            program.bind(device);
            device.bind_texture_unit(0, backend_name(equirect)?);
            device.bind_image_texture(
                0,
                environment,
                0,
                true,
                ImageAccess::WriteOnly,
                TextureFormat::Rgba16F,
            );
            let groups = [
                maps.environment.width() / WORK_GROUP_SIZE,
                maps.environment.height() / WORK_GROUP_SIZE,
                CUBE_FACES,
            ];
            log::debug!("Dispatching equirect projection {:?}", groups);
            device.dispatch_compute(groups);
            Ok(())
        })
    })?;

    let environment = backend_name(&maps.environment)?;
    device.memory_barrier(PRECOMPUTE_BARRIER);
    device.generate_mipmap(environment);
    Ok(())
}

fn convolve_irradiance<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    assets: &dyn AssetSource,
    paths: &AssetPaths,
    maps: &mut EnvironmentMaps,
) -> BackendResult<()> {
    log::info!("Computing diffuse irradiance map");

    let program = build_compute_program(
        &mut ProgramBuilder::new(device, assets),
        paths,
        shader_files::IRRADIANCE_CS,
    )?;

    with_transient_program(device, program, |device, program| {
        maps.irradiance = ResourceFactory::new(device).create_texture(
            TextureTarget::CubeMap,
            IRRADIANCE_SIZE,
            IRRADIANCE_SIZE,
            TextureFormat::Rgba16F,
            MipLevels::Exact(1),
        )?;

        program.bind(device);
        device.bind_texture_unit(0, backend_name(&maps.environment)?);
        device.bind_image_texture(
            0,
            backend_name(&maps.irradiance)?,
            0,
            true,
            ImageAccess::WriteOnly,
            TextureFormat::Rgba16F,
        );
        device.dispatch_compute([
            maps.irradiance.width() / WORK_GROUP_SIZE,
            maps.irradiance.height() / WORK_GROUP_SIZE,
            CUBE_FACES,
        ]);
        Ok(())
    })?;

    device.memory_barrier(PRECOMPUTE_BARRIER);
    Ok(())
}

fn prefilter_specular<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    assets: &dyn AssetSource,
    paths: &AssetPaths,
    maps: &mut EnvironmentMaps,
) -> BackendResult<()> {
    log::info!("Pre-filtering specular environment map");

    let program = SpecularFilterProgram::build(&mut ProgramBuilder::new(device, assets), paths)?;

    with_transient_program(device, program, |device, program| {
        maps.specular = ResourceFactory::new(device).create_texture(
            TextureTarget::CubeMap,
            ENVIRONMENT_SIZE,
            ENVIRONMENT_SIZE,
            TextureFormat::Rgba16F,
            MipLevels::Full,
        )?;
        let specular = backend_name(&maps.specular)?;
        let levels = maps.specular.levels();
        let delta = roughness_delta(levels);

        program.bind(device);
        device.bind_texture_unit(0, backend_name(&maps.environment)?);

        // Runs one level past the mip chain. Binding a level beyond the
        // storage leaves the image unit incomplete, so that dispatch's
        // stores are discarded.
        for level in 0..=levels {
            let groups = specular_dispatch_groups(level);
            device.bind_image_texture(
                0,
                specular,
                level,
                true,
                ImageAccess::WriteOnly,
                TextureFormat::Rgba16F,
            );
            program.set_roughness(device, level as f32 * delta);
            log::debug!("Specular level {}: {}x{} groups", level, groups, groups);
            device.dispatch_compute([groups, groups, CUBE_FACES]);
        }
        Ok(())
    })?;

    device.memory_barrier(PRECOMPUTE_BARRIER);
    Ok(())
}

fn integrate_brdf<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    assets: &dyn AssetSource,
    paths: &AssetPaths,
    maps: &mut EnvironmentMaps,
) -> BackendResult<()> {
    log::info!("Integrating specular BRDF lookup table");

    let program = build_compute_program(
        &mut ProgramBuilder::new(device, assets),
        paths,
        shader_files::SPECULAR_BRDF_CS,
    )?;

    with_transient_program(device, program, |device, program| {
        maps.brdf_lut = ResourceFactory::new(device).create_texture(
            TextureTarget::Texture2D,
            BRDF_LUT_SIZE,
            BRDF_LUT_SIZE,
            TextureFormat::Rg16F,
            MipLevels::Exact(1),
        )?;

        program.bind(device);
        device.bind_image_texture(
            0,
            backend_name(&maps.brdf_lut)?,
            0,
            false,
            ImageAccess::WriteOnly,
            TextureFormat::Rg16F,
        );
        device.dispatch_compute([
            maps.brdf_lut.width() / WORK_GROUP_SIZE,
            maps.brdf_lut.height() / WORK_GROUP_SIZE,
            1,
        ]);
        Ok(())
    })?;

    device.memory_barrier(PRECOMPUTE_BARRIER);
    Ok(())
}

/// Cubemap face in GL layer order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    /// +X
    PositiveX,
    /// -X
    NegativeX,
    /// +Y
    PositiveY,
    /// -Y
    NegativeY,
    /// +Z
    PositiveZ,
    /// -Z
    NegativeZ,
}

impl CubeFace {
    /// Every face, indexed by layer
    pub const ALL: [Self; 6] = [
        Self::PositiveX,
        Self::NegativeX,
        Self::PositiveY,
        Self::NegativeY,
        Self::PositiveZ,
        Self::NegativeZ,
    ];

    /// Array layer of this face
    pub fn layer(self) -> u32 {
        self as u32
    }
}

/// Direction written by the projection shader for texel `(x, y)` of `face`
pub fn sampling_vector(face: CubeFace, x: u32, y: u32, size: u32) -> Vec3 {
    let st = Vec2::new(x as f32, y as f32) / size as f32;
    let uv = Vec2::new(st.x, 1.0 - st.y) * 2.0 - Vec2::new(1.0, 1.0);

    let direction = match face {
        CubeFace::PositiveX => Vec3::new(1.0, uv.y, -uv.x),
        CubeFace::NegativeX => Vec3::new(-1.0, uv.y, uv.x),
        CubeFace::PositiveY => Vec3::new(uv.x, 1.0, -uv.y),
        CubeFace::NegativeY => Vec3::new(uv.x, -1.0, uv.y),
        CubeFace::PositiveZ => Vec3::new(uv.x, uv.y, 1.0),
        CubeFace::NegativeZ => Vec3::new(-uv.x, uv.y, -1.0),
    };
    direction.normalize()
}

/// Equirectangular texture coordinate looked up for `direction`
pub fn equirect_texcoord(direction: &Vec3) -> Vec2 {
    let phi = direction.z.atan2(direction.x);
    let theta = direction.y.clamp(-1.0, 1.0).acos();
    Vec2::new(phi / constants::TAU, theta / constants::PI)
}

/// Texel the projection shader stores at `(x, y)` of `face`
///
/// Samples `image` with nearest filtering and repeat wrapping.
pub fn project_equirect_texel(image: &ImageData, face: CubeFace, x: u32, y: u32, size: u32) -> Vec<f32> {
    let texcoord = equirect_texcoord(&sampling_vector(face, x, y, size));
    let wrap = |coord: f32, extent: u32| -> u32 {
        let texel = (coord * extent as f32).floor() as i64;
        texel.rem_euclid(i64::from(extent)) as u32
    };
    image.texel(wrap(texcoord.x, image.width), wrap(texcoord.y, image.height))
}
