//! Engine error types.

use std::fmt;
use std::io;

use thiserror::Error;

/// Fixed-capacity table that can run out of free slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Inode table.
    Inodes,
    /// Data block pool.
    Blocks,
    /// Directory entry array.
    DirEntries,
    /// Open-file handle table.
    Handles,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Inodes => "inode",
            Resource::Blocks => "block",
            Resource::DirEntries => "directory entry",
            Resource::Handles => "open-file",
        })
    }
}

/// Engine error type.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path is empty, relative, or names no valid flat entry.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// Name not present in the directory.
    #[error("not found: {0}")]
    NotFound(String),

    /// A preallocated table is full.
    #[error("no space left in the {0} table")]
    NoSpace(Resource),

    /// Operation not permitted on this kind of inode.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Handle is not open.
    #[error("invalid handle: {0}")]
    InvalidHandle(usize),

    /// Symbolic link resolution would need more than one hop.
    #[error("too many levels of symbolic links: {0}")]
    TooManyLinks(String),

    /// Rejected engine configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O failure on the external byte source (copy-in only).
    #[error("host I/O error: {0}")]
    HostIo(#[from] io::Error),
}

impl FsError {
    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an InvalidOperation error.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Convert FsError to std::io::Error for host interop.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::NoSpace(resource) => io::Error::new(
                io::ErrorKind::StorageFull,
                format!("no space left in the {resource} table"),
            ),
            FsError::InvalidOperation(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FsError::InvalidHandle(handle) => io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid handle: {handle}"),
            ),
            FsError::TooManyLinks(msg) => io::Error::new(io::ErrorKind::Other, msg),
            FsError::Config(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FsError::HostIo(e) => e,
        }
    }
}

/// Engine result type.
pub type FsResult<T> = Result<T, FsError>;
