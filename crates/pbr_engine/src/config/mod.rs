//! Configuration loading
//!
//! Configs are plain serde structs with defaults. The file extension picks
//! the encoding, and every file load ends with the type's own
//! [`Config::validate`] check.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

mod viewer;

pub use viewer::{AssetPaths, ViewDefaults, ViewerConfig, WindowConfig};

/// On-disk encodings, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Pick the encoding for `path`, ignoring extension case
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Deserialize `text`
    pub fn decode<T: for<'de> Deserialize<'de>>(self, text: &str) -> Result<T, ConfigError> {
        match self {
            Self::Toml => toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string())),
            Self::Ron => ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Serialize `value` in human-editable form
    pub fn encode<T: Serialize>(self, value: &T) -> Result<String, ConfigError> {
        match self {
            Self::Toml => toml::to_string_pretty(value).map_err(|e| ConfigError::Serialize(e.to_string())),
            Self::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }
}

/// A serde-backed settings struct that can live in a TOML or RON file
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Reject values that deserialize but cannot be used
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Read, decode and validate a config file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = format.decode(&contents)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Decode config text as if read from `path`, without validating it
    fn parse(path: impl AsRef<Path>, contents: &str) -> Result<Self, ConfigError> {
        ConfigFormat::from_path(path.as_ref())?.decode(contents)
    }

    /// Write the config in the encoding `path` asks for
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = ConfigFormat::from_path(path)?.encode(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("Cannot access config file {path}: {source}")]
    Io {
        /// File involved
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
