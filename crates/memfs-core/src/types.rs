//! Core type definitions for memfs

use serde::{Deserialize, Serialize};

/// Opaque content store entry identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentId(u64);

impl ContentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Opaque namespace node identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// The root directory always has this id
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Node classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Directory,
    File,
}

/// Caller identity and wall clock, supplied by the driver shell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub uid: u32,
    pub gid: u32,
    /// Seconds since the Unix epoch
    pub now: i64,
}

impl RequestContext {
    pub fn new(uid: u32, gid: u32, now: i64) -> Self {
        Self { uid, gid, now }
    }
}

/// File attributes as reported by getattr
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub file_type: FileType,
    /// Permission bits only; the type is carried by `file_type`
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

/// Directory entry information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: name.into(),
            file_type,
        }
    }
}

/// Point-in-time usage summary
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FsStats {
    /// Directories excluding the root
    pub directories: usize,
    pub files: usize,
    pub bytes_in_use: u64,
}
