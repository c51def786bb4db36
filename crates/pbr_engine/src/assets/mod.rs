//! Asset loading
//!
//! The renderer never touches the filesystem directly. It asks an
//! [`AssetSource`] for shader text, meshes and images by relative path, so
//! setup can run against files on disk or against an in-memory scene.

pub mod image_loader;
pub mod mesh;
pub mod obj_loader;

pub use image_loader::{ImageData, PixelData};
pub use mesh::{Face, Mesh, Vertex};
pub use obj_loader::{ObjError, ObjLoader};

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// No asset under the requested path
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The asset exists but could not be decoded
    #[error("Asset load failed: {0}")]
    LoadFailed(String),

    /// Mesh parsing error
    #[error("OBJ error: {0}")]
    Obj(#[from] ObjError),

    /// Requested channel count cannot be produced
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u8),
}

/// Provider of everything the renderer loads during setup
pub trait AssetSource {
    /// Full text of a file, or an empty string when it cannot be read
    fn read_text(&self, path: &str) -> String;

    /// Load a triangle mesh
    fn load_mesh(&self, path: &str) -> Result<Mesh, AssetError>;

    /// Load an image converted to `channels` components per pixel
    fn load_image(&self, path: &str, channels: u8) -> Result<ImageData, AssetError>;
}

/// Assets resolved against a directory on disk
#[derive(Debug, Clone)]
pub struct FileSystemAssets {
    root: PathBuf,
}

impl FileSystemAssets {
    /// Resolve paths relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Base directory
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetSource for FileSystemAssets {
    fn read_text(&self, path: &str) -> String {
        let full = self.resolve(path);
        std::fs::read_to_string(&full).unwrap_or_else(|e| {
            log::warn!("Cannot read {}: {}", full.display(), e);
            String::new()
        })
    }

    fn load_mesh(&self, path: &str) -> Result<Mesh, AssetError> {
        let full = self.resolve(path);
        if !full.exists() {
            return Err(AssetError::NotFound(full.display().to_string()));
        }
        log::debug!("Loading mesh from: {}", full.display());
        Ok(ObjLoader::load_obj(&full)?)
    }

    fn load_image(&self, path: &str, channels: u8) -> Result<ImageData, AssetError> {
        let full = self.resolve(path);
        if !full.exists() {
            return Err(AssetError::NotFound(full.display().to_string()));
        }
        ImageData::from_file(&full, channels)
    }
}

/// Assets held in memory, keyed by path
///
/// Meshes without an explicit entry are parsed from a text entry of the same
/// path, so OBJ sources can be registered as plain text.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssets {
    texts: HashMap<String, String>,
    meshes: HashMap<String, Mesh>,
    images: HashMap<String, ImageData>,
}

impl InMemoryAssets {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a text file
    #[must_use]
    pub fn with_text(mut self, path: &str, text: impl Into<String>) -> Self {
        self.texts.insert(path.to_string(), text.into());
        self
    }

    /// Register a mesh
    #[must_use]
    pub fn with_mesh(mut self, path: &str, mesh: Mesh) -> Self {
        self.meshes.insert(path.to_string(), mesh);
        self
    }

    /// Register an image
    #[must_use]
    pub fn with_image(mut self, path: &str, image: ImageData) -> Self {
        self.images.insert(path.to_string(), image);
        self
    }
}

impl AssetSource for InMemoryAssets {
    fn read_text(&self, path: &str) -> String {
        self.texts.get(path).cloned().unwrap_or_default()
    }

    fn load_mesh(&self, path: &str) -> Result<Mesh, AssetError> {
        if let Some(mesh) = self.meshes.get(path) {
            return Ok(mesh.clone());
        }
        let text = self
            .texts
            .get(path)
            .ok_or_else(|| AssetError::NotFound(path.to_string()))?;
        Ok(ObjLoader::parse(Cursor::new(text.as_bytes()))?)
    }

    fn load_image(&self, path: &str, channels: u8) -> Result<ImageData, AssetError> {
        let image = self
            .images
            .get(path)
            .ok_or_else(|| AssetError::NotFound(path.to_string()))?;
        if image.channels != channels {
            return Err(AssetError::LoadFailed(format!(
                "{path} holds {} channels, {channels} requested",
                image.channels
            )));
        }
        Ok(image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_text_defaults_to_empty() {
        let assets = InMemoryAssets::new().with_text("a.glsl", "void main() {}");
        assert_eq!(assets.read_text("a.glsl"), "void main() {}");
        assert_eq!(assets.read_text("missing.glsl"), "");
    }

    #[test]
    fn test_in_memory_mesh_from_obj_text() {
        let assets = InMemoryAssets::new().with_text("tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let mesh = assets.load_mesh("tri.obj").unwrap();
        assert_eq!(mesh.faces().len(), 1);
        assert!(matches!(assets.load_mesh("none.obj"), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_in_memory_image_channel_check() {
        let assets = InMemoryAssets::new().with_image("m.png", ImageData::solid_color(2, 2, &[128]));
        assert!(assets.load_image("m.png", 1).is_ok());
        assert!(assets.load_image("m.png", 3).is_err());
    }

    #[test]
    fn test_file_system_missing_files() {
        let assets = FileSystemAssets::new("/nonexistent-asset-root");
        assert_eq!(assets.read_text("shader.glsl"), "");
        assert!(matches!(assets.load_mesh("m.obj"), Err(AssetError::NotFound(_))));
        assert!(matches!(assets.load_image("t.png", 3), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_file_system_reads_workspace_skybox() {
        let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets");
        let assets = FileSystemAssets::new(root);
        let mesh = assets.load_mesh("meshes/skybox.obj").unwrap();
        assert_eq!(mesh.faces().len(), 12);
    }
}
