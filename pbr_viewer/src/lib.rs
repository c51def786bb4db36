//! PBR viewer support: orbit input and top-level errors

pub mod input;

use pbr_engine::config::ConfigError;
use pbr_engine::render::RenderError;
use thiserror::Error;

pub use input::{InputEvent, InputResponse, OrbitController};

/// Fatal viewer errors
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Window, context or renderer failure
    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),
}
