//! # Viewer Configuration
//!
//! Window, asset, and camera settings for the PBR viewer. Every section
//! falls back to the Cerberus demo scene defaults, so a config file
//! only needs to list what it overrides.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Window and main render target settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in pixels (also the main framebuffer width)
    pub width: u32,
    /// Window height in pixels (also the main framebuffer height)
    pub height: u32,
    /// MSAA sample count of the main framebuffer; 0 disables multisampling
    pub samples: u32,
    /// Window title
    pub title: String,
    /// Block presentation on vertical sync instead of adaptive swap
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            samples: 16,
            title: "Physically Based Rendering (OpenGL 4.5)".to_string(),
            vsync: false,
        }
    }
}

/// Locations of every file the renderer loads during setup
///
/// All paths are relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    /// Base directory the other paths are resolved against
    pub root: String,
    /// Directory holding the GLSL shader set
    pub shader_dir: String,
    /// Skybox cube mesh
    pub skybox_mesh: String,
    /// PBR model mesh
    pub model_mesh: String,
    /// Albedo (base color) texture, sRGB
    pub albedo: String,
    /// Tangent-space normal map
    pub normal: String,
    /// Single-channel metalness map
    pub metalness: String,
    /// Single-channel roughness map
    pub roughness: String,
    /// Equirectangular HDR environment map
    pub environment: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            shader_dir: "shaders/glsl".to_string(),
            skybox_mesh: "meshes/skybox.obj".to_string(),
            model_mesh: "meshes/cerberus.obj".to_string(),
            albedo: "textures/cerberus_A.png".to_string(),
            normal: "textures/cerberus_N.png".to_string(),
            metalness: "textures/cerberus_M.png".to_string(),
            roughness: "textures/cerberus_R.png".to_string(),
            environment: "environment.hdr".to_string(),
        }
    }
}

impl AssetPaths {
    /// Path of a shader file inside `shader_dir`
    pub fn shader(&self, file_name: &str) -> String {
        format!("{}/{}", self.shader_dir.trim_end_matches('/'), file_name)
    }

    fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("root", &self.root),
            ("shader_dir", &self.shader_dir),
            ("skybox_mesh", &self.skybox_mesh),
            ("model_mesh", &self.model_mesh),
            ("albedo", &self.albedo),
            ("normal", &self.normal),
            ("metalness", &self.metalness),
            ("roughness", &self.roughness),
            ("environment", &self.environment),
        ]
    }
}

/// Initial camera placement and input sensitivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewDefaults {
    /// Initial distance from the model, in world units
    pub distance: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Degrees of rotation per pixel of mouse drag
    pub orbit_speed: f32,
    /// World units of zoom per scroll step
    pub zoom_speed: f32,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            distance: 150.0,
            fov: 45.0,
            orbit_speed: 1.0,
            zoom_speed: 4.0,
        }
    }
}

/// Top-level viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window and framebuffer settings
    pub window: WindowConfig,
    /// Asset file locations
    pub assets: AssetPaths,
    /// Camera defaults
    pub view: ViewDefaults,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: AssetPaths::default(),
            view: ViewDefaults::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config for ViewerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        let samples = self.window.samples;
        if samples != 0 && (!samples.is_power_of_two() || samples > 32) {
            return Err(ConfigError::Invalid(format!(
                "Sample count must be 0 or a power of two up to 32, got {samples}"
            )));
        }

        if let Some((name, _)) = self.assets.entries().iter().find(|(_, path)| path.is_empty()) {
            return Err(ConfigError::Invalid(format!("Asset path '{name}' cannot be empty")));
        }

        if !(self.view.fov > 0.0 && self.view.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "Field of view must be within (0, 180) degrees, got {}",
                self.view.fov
            )));
        }

        Ok(())
    }
}
