//! # PBR Engine
//!
//! Physically based renderer with image-based lighting.
//!
//! ## Features
//!
//! - **Image-Based Lighting**: environment cubemap, diffuse irradiance,
//!   pre-filtered specular and BRDF lookup table computed on the GPU
//! - **Metal/Roughness Materials**: albedo, normal, metalness and roughness maps
//! - **HDR Pipeline**: multisampled half-float target, resolve and tonemapping
//! - **Headless Testing**: every command runs against a recording device
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pbr_engine::prelude::*;
//!
//! # fn run<D: GraphicsDevice>(device: D, surface: &mut dyn FrameSurface) -> Result<(), RenderError> {
//! let config = ViewerConfig::default();
//! let assets = FileSystemAssets::new(&config.assets.root);
//!
//! let mut renderer = Renderer::initialize(device, 1024, 1024, 16)?;
//! renderer.setup(&assets, &config.assets)?;
//! renderer.render(surface, &ViewSettings::default());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, AssetSource, FileSystemAssets, ImageData, InMemoryAssets, Mesh, Vertex},
        config::{AssetPaths, Config, ConfigError, ViewerConfig},
        foundation::math::{Mat4, Quat, Vec3},
        render::{
            FrameSurface, FrameTransforms, GraphicsDevice, RecordingDevice, RenderError, Renderer,
            ViewSettings,
        },
    };
}
