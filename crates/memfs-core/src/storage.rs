//! Content store for file data

use std::collections::HashMap;

use tracing::warn;

use crate::error::FsResult;
use crate::{ContentId, FsError};

/// Storage backend holding one growable byte buffer per file.
///
/// Mutating methods take `&mut self`; callers serialize access (see
/// `FsCore`), which makes a growing write atomic for readers.
pub trait StorageBackend: Send + Sync {
    fn allocate(&mut self) -> FsResult<ContentId>;
    fn read(&self, id: ContentId, offset: u64, max_len: usize) -> FsResult<Vec<u8>>;
    fn write(&mut self, id: ContentId, offset: u64, data: &[u8]) -> FsResult<usize>;
    fn len(&self, id: ContentId) -> FsResult<u64>;
    fn release(&mut self, id: ContentId) -> FsResult<()>;
    /// Sum of the logical lengths of all live entries
    fn bytes_in_use(&self) -> u64;
}

/// In-memory storage backend implementation
#[derive(Debug)]
pub struct InMemoryBackend {
    next_id: u64,
    data: HashMap<ContentId, Vec<u8>>,
    bytes_in_use: u64,
    max_bytes: Option<u64>,
}

impl InMemoryBackend {
    pub fn new(max_bytes: Option<u64>) -> Self {
        Self {
            next_id: 1,
            data: HashMap::new(),
            bytes_in_use: 0,
            max_bytes,
        }
    }

    fn get_next_id(&mut self) -> ContentId {
        let id = ContentId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StorageBackend for InMemoryBackend {
    fn allocate(&mut self) -> FsResult<ContentId> {
        let id = self.get_next_id();
        self.data.insert(id, Vec::new());
        Ok(id)
    }

    fn read(&self, id: ContentId, offset: u64, max_len: usize) -> FsResult<Vec<u8>> {
        let content = self.data.get(&id).ok_or(FsError::NotFound)?;

        let start = match usize::try_from(offset) {
            Ok(start) if start < content.len() => start,
            _ => return Ok(Vec::new()),
        };

        let end = start + std::cmp::min(max_len, content.len() - start);
        Ok(content[start..end].to_vec())
    }

    fn write(&mut self, id: ContentId, offset: u64, data: &[u8]) -> FsResult<usize> {
        let content = self.data.get_mut(&id).ok_or(FsError::NotFound)?;

        // Zero-length writes never extend the file
        if data.is_empty() {
            return Ok(0);
        }

        let start = usize::try_from(offset).map_err(|_| FsError::OutOfMemory)?;
        let end = start.checked_add(data.len()).ok_or(FsError::OutOfMemory)?;

        if end > content.len() {
            let growth = (end - content.len()) as u64;
            let new_total = self.bytes_in_use.saturating_add(growth);
            if let Some(max) = self.max_bytes {
                if new_total > max {
                    warn!(
                        "write refused: {} bytes in use, {} requested, limit {}",
                        self.bytes_in_use, growth, max
                    );
                    return Err(FsError::OutOfMemory);
                }
            }

            content
                .try_reserve_exact(end - content.len())
                .map_err(|_| FsError::OutOfMemory)?;
            // Gap between the old end and `offset` is zero-filled
            content.resize(end, 0);
            self.bytes_in_use = new_total;
        }

        content[start..end].copy_from_slice(data);
        Ok(data.len())
    }

    fn len(&self, id: ContentId) -> FsResult<u64> {
        let content = self.data.get(&id).ok_or(FsError::NotFound)?;
        Ok(content.len() as u64)
    }

    fn release(&mut self, id: ContentId) -> FsResult<()> {
        let content = self.data.remove(&id).ok_or(FsError::NotFound)?;
        self.bytes_in_use -= content.len() as u64;
        Ok(())
    }

    fn bytes_in_use(&self) -> u64 {
        self.bytes_in_use
    }
}
