//! TOML configuration for the transform pipeline and its front ends.

use crate::codec::{ImageCodec, OutputFormat};
use crate::{ImageError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names searched, in order, when no path is given.
pub const CONFIG_CANDIDATES: [&str; 3] = [".pixmill.toml", "pixmill.toml", ".config/pixmill.toml"];

/// Root configuration schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSchema {
    /// Encoder settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Fallback request values
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Encoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// JPEG quality (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: default_quality(),
        }
    }
}

fn default_quality() -> u8 {
    85
}

/// Request values used when the caller leaves them out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Output width
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height
    #[serde(default = "default_height")]
    pub height: u32,

    /// Sharpening opacity (0-100)
    #[serde(default)]
    pub sharpening: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            sharpening: 0,
        }
    }
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    360
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,

    /// Include the event target in log lines
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            show_target: false,
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path, or the first candidate file that
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

        let schema = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };

        Ok(Self {
            schema,
            path: config_path,
        })
    }

    /// Codec described by the `[output]` section.
    pub fn codec(&self) -> ImageCodec {
        ImageCodec {
            format: self.schema.output.format,
            quality: self.schema.output.quality,
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ImageError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let schema: ConfigSchema = toml::from_str(&content).map_err(|e| {
        ImageError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;

    if !(1..=100).contains(&schema.output.quality) {
        return Err(ImageError::Config(format!(
            "output.quality must be between 1 and 100, got {}",
            schema.output.quality
        )));
    }

    Ok(schema)
}
