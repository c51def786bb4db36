//! # Rendering System
//!
//! Image-based lighting PBR renderer built on a small graphics device
//! abstraction.
//!
//! ## Architecture
//!
//! - **Device**: [`GraphicsDevice`], the subset of OpenGL 4.5 the renderer uses
//! - **Factory**: texture, framebuffer and vertex buffer creation and release
//! - **Programs**: shader compilation, linking and typed uniforms
//! - **Environment**: compute precomputation of the lighting maps
//! - **Frame**: camera transforms and the per-frame pass sequence
//! - **Renderer**: owns the device and every resource
//!
//! The `opengl` feature adds the glow device and GLFW window. Without it the
//! renderer runs against [`RecordingDevice`].

pub mod device;
pub mod environment;
pub mod factory;
pub mod frame;
pub mod program;
pub mod recording;
pub mod renderer;
pub mod resources;

/// OpenGL 4.5 backend
#[cfg(feature = "opengl")]
#[allow(unsafe_code)]
pub mod opengl;

#[cfg(test)]
mod factory_tests;
#[cfg(test)]
mod renderer_tests;

pub use device::{BackendResult, GraphicsDevice};
pub use environment::EnvironmentMaps;
pub use factory::{MipLevels, ResourceFactory};
pub use frame::{FrameSurface, FrameTransforms, MaterialTextures, ViewSettings};
pub use program::{ProgramBuilder, ProgramHandle};
pub use recording::{DeviceCall, RecordingDevice};
pub use renderer::Renderer;
pub use resources::{FrameBuffer, ShaderProgram, Texture, VertexBuffer};

use thiserror::Error;

use crate::assets::AssetError;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Window or GL context could not be created
    #[error("Context creation failed: {0}")]
    ContextCreation(String),

    /// Shader file missing or empty
    #[error("Cannot read shader source file: {path}")]
    ShaderSourceUnreadable {
        /// Shader path
        path: String,
    },

    /// Shader failed to compile
    #[error("Shader compilation failed: {path}\n{log}")]
    ShaderCompilation {
        /// Shader path
        path: String,
        /// Driver info log
        log: String,
    },

    /// Program failed to link or validate
    #[error("Program link failed\n{log}")]
    ProgramLink {
        /// Driver info log
        log: String,
    },

    /// Framebuffer completeness check failed
    #[error("Framebuffer completeness check failed: {status}")]
    FramebufferIncomplete {
        /// Raw GL status code
        status: u32,
    },

    /// Object creation or storage allocation failed
    #[error("Resource allocation failed: {0}")]
    ResourceAllocation(String),

    /// Image data does not match the requested upload
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Asset loading error
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}
