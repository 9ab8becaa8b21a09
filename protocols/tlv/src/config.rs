//! Decode limits for TLV readers.

use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

/// Limits applied while decoding TLV records from the wire
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest value length accepted from a length header
    pub max_value_length: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_value_length: i32::MAX as u32,
        }
    }
}

impl CodecConfig {
    pub fn new(max_value_length: u32) -> Self {
        Self { max_value_length }
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
