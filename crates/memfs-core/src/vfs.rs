//! Filesystem operations for memfs core

use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::FileSizeReport;
use crate::error::{FsError, FsResult};
use crate::namespace::{FileInsert, NamespaceTree, NodeRef};
use crate::storage::{InMemoryBackend, StorageBackend};
use crate::{Attributes, DirEntry, FileType, FsConfig, FsStats, RequestContext};

/// Link counts reported by getattr
const DIR_NLINK: u32 = 2;
const FILE_NLINK: u32 = 1;

/// Namespace and content guarded together
struct FsState {
    tree: NamespaceTree,
    storage: Box<dyn StorageBackend>,
}

/// The main filesystem core implementation.
///
/// One instance per mount. All verbs go through a single `RwLock`:
/// getattr, readdir and read share it, every mutation holds it
/// exclusively.
pub struct FsCore {
    config: FsConfig,
    state: RwLock<FsState>,
}

impl FsCore {
    pub fn new(config: FsConfig) -> FsResult<Self> {
        let storage = Box::new(InMemoryBackend::new(config.memory.max_bytes_in_memory));
        Self::with_backend(config, storage)
    }

    pub fn with_backend(config: FsConfig, storage: Box<dyn StorageBackend>) -> FsResult<Self> {
        if config.limits.max_name_len == 0 {
            return Err(FsError::InvalidArgument);
        }

        let tree = NamespaceTree::new(config.attrs.root_mode, config.limits.max_name_len);
        Ok(Self {
            config,
            state: RwLock::new(FsState { tree, storage }),
        })
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn is_directory(&self, path: &Path) -> bool {
        self.state.read().tree.is_directory(path)
    }

    pub fn is_file(&self, path: &Path) -> bool {
        self.state.read().tree.is_file(path)
    }

    pub fn stats(&self) -> FsStats {
        let state = self.state.read();
        let (directories, files) = state.tree.counts();
        FsStats {
            directories,
            files,
            bytes_in_use: state.storage.bytes_in_use(),
        }
    }

    pub fn getattr(&self, path: &Path, ctx: &RequestContext) -> FsResult<Attributes> {
        let state = self.state.read();
        let node = state.tree.lookup(path).ok_or(FsError::NotFound)?;

        let (file_type, nlink, size) = match node {
            NodeRef::Directory { .. } => (FileType::Directory, DIR_NLINK, 0),
            NodeRef::File { content_id, .. } => {
                let size = match self.config.attrs.file_size {
                    FileSizeReport::Fixed(size) => size,
                    FileSizeReport::Logical => state.storage.len(content_id)?,
                };
                (FileType::File, FILE_NLINK, size)
            }
        };

        Ok(Attributes {
            file_type,
            mode: node.mode(),
            nlink,
            size,
            uid: ctx.uid,
            gid: ctx.gid,
            atime: ctx.now,
            mtime: ctx.now,
            ctime: ctx.now,
        })
    }

    /// List `.`, `..`, then child directories and files in creation order
    pub fn readdir(&self, path: &Path) -> FsResult<Vec<DirEntry>> {
        let state = self.state.read();
        let children = state.tree.list_children(path)?;

        let mut entries = vec![
            DirEntry::new(".", FileType::Directory),
            DirEntry::new("..", FileType::Directory),
        ];
        entries.extend(children.map(|(name, file_type)| DirEntry::new(name, file_type)));
        Ok(entries)
    }

    pub fn read(&self, path: &Path, offset: u64, size: usize) -> FsResult<Vec<u8>> {
        let state = self.state.read();
        let content_id = state
            .tree
            .lookup(path)
            .and_then(|node| node.content_id())
            .ok_or(FsError::NotFound)?;

        state.storage.read(content_id, offset, size)
    }

    pub fn write(&self, path: &Path, offset: u64, data: &[u8]) -> FsResult<usize> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let content_id = state
            .tree
            .lookup(path)
            .and_then(|node| node.content_id())
            .ok_or(FsError::NotFound)?;

        let written = state.storage.write(content_id, offset, data)?;
        debug!("write {}: {} bytes at offset {}", path.display(), written, offset);
        Ok(written)
    }

    pub fn mkdir(&self, path: &Path, mode: u32) -> FsResult<()> {
        let mut state = self.state.write();
        state.tree.insert_directory(path, mode)?;
        debug!("mkdir {} mode {:o}", path.display(), mode);
        Ok(())
    }

    /// Create an empty file; an existing file of that name is emptied
    pub fn create(&self, path: &Path, mode: u32) -> FsResult<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let content_id = state.storage.allocate()?;
        match state.tree.insert_file(path, mode, content_id) {
            Ok(FileInsert { replaced, .. }) => {
                if let Some(old) = replaced {
                    debug!("create {}: replacing existing content", path.display());
                    // The tree already points at the new content
                    if let Err(err) = state.storage.release(old) {
                        warn!("create {}: failed to release content {}: {}", path.display(), old.get(), err);
                    }
                }
                debug!("create {} mode {:o}", path.display(), mode);
                Ok(())
            }
            Err(err) => {
                if let Err(release_err) = state.storage.release(content_id) {
                    warn!(
                        "create {}: failed to release content {}: {}",
                        path.display(),
                        content_id.get(),
                        release_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Same as `create`; device numbers are not stored
    pub fn mknod(&self, path: &Path, mode: u32, _rdev: u64) -> FsResult<()> {
        self.create(path, mode)
    }
}
