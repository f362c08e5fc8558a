//! Configuration types for memfs core

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading a configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Memory policy for the content store
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPolicy {
    /// Upper bound on the sum of all file lengths; `None` means unbounded
    pub max_bytes_in_memory: Option<u64>,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            max_bytes_in_memory: Some(1024 * 1024 * 1024), // 1GB
        }
    }
}

/// Namespace limits
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FsLimits {
    /// Longest accepted path segment, in bytes
    pub max_name_len: usize,
}

impl Default for FsLimits {
    fn default() -> Self {
        Self { max_name_len: 255 }
    }
}

/// How getattr reports the size of regular files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSizeReport {
    /// Every file reports the same size regardless of its content
    Fixed(u64),
    /// Files report their logical length
    Logical,
}

/// Attribute reporting settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AttrPolicy {
    pub file_size: FileSizeReport,
    /// Permission bits reported for `/`
    pub root_mode: u32,
}

impl Default for AttrPolicy {
    fn default() -> Self {
        Self {
            file_size: FileSizeReport::Fixed(1024),
            root_mode: 0o755,
        }
    }
}

/// Main filesystem configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub memory: MemoryPolicy,
    pub limits: FsLimits,
    pub attrs: AttrPolicy,
}

impl FsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
