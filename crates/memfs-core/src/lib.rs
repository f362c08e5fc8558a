//! memfs core: in-memory filesystem core for user-space drivers
//!
//! This crate provides the namespace tree, the content store and the
//! operation layer (getattr, readdir, mkdir, create, read, write) that a
//! driver shell calls into.

pub mod config;
pub mod error;
pub mod namespace;
pub mod storage;
pub mod types;
pub mod vfs;

// Re-export key types for convenience
pub use config::{AttrPolicy, ConfigError, FileSizeReport, FsConfig, FsLimits, MemoryPolicy};
pub use error::{FsError, FsResult};
pub use namespace::{FileInsert, NamespaceTree, NodeRef};
pub use storage::{InMemoryBackend, StorageBackend};
pub use types::*;
pub use vfs::FsCore;
