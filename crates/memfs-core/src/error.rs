//! Error types for memfs core

/// Core filesystem error type
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("name not allowed")]
    InvalidName,
    #[error("not a directory")]
    NotADirectory,
}

impl FsError {
    /// POSIX errno a driver shell should report for this error
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => 2,         // ENOENT
            FsError::AlreadyExists => 17,   // EEXIST
            FsError::OutOfMemory => 12,     // ENOMEM
            FsError::InvalidArgument => 22, // EINVAL
            FsError::InvalidName => 36,     // ENAMETOOLONG
            FsError::NotADirectory => 20,   // ENOTDIR
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
