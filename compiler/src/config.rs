use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ProtoError;

/// Bounds applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Largest top-level input accepted, in bytes.
    pub max_message_size: usize,
    /// Largest length prefix accepted for any length-delimited value.
    pub max_length:       usize,
    /// Deepest nesting of embedded messages.
    pub max_depth:        usize,
}

impl Default for DecodeLimits {
    fn default() -> DecodeLimits {
        DecodeLimits {
            max_message_size: 64 << 20,
            max_length:       64 << 20,
            max_depth:        100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub limits: DecodeLimits,
}

impl CodecConfig {
    pub fn from_json(text: &str) -> Result<CodecConfig, ProtoError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<CodecConfig, ProtoError> {
        let text = std::fs::read_to_string(path)?;
        CodecConfig::from_json(&text)
    }
}
