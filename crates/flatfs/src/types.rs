//! Core value types of the engine surface.

use serde::{Deserialize, Serialize};

/// Inode type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Open mode flags.
///
/// The flags combine freely; the zero value (`Default`) opens an existing
/// file for reading and writing at cursor 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Create the file if it does not exist.
    pub create: bool,
    /// Discard existing content on open.
    pub truncate: bool,
    /// Start the cursor at the current end of data.
    pub append: bool,
}

impl OpenFlags {
    /// Open an existing file, cursor at 0.
    pub fn open() -> Self {
        Self::default()
    }

    /// Create if missing.
    pub fn create() -> Self {
        Self {
            create: true,
            ..Default::default()
        }
    }

    /// Create if missing, discard existing content.
    pub fn create_truncate() -> Self {
        Self {
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Open an existing file with the cursor at end of data.
    pub fn append() -> Self {
        Self {
            append: true,
            ..Default::default()
        }
    }

    /// Create if missing, cursor at end of data.
    pub fn create_append() -> Self {
        Self {
            create: true,
            append: true,
            ..Default::default()
        }
    }
}

/// Point-in-time usage counters for the engine's preallocated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsStats {
    /// Inodes in use (including the root directory).
    pub inodes_used: usize,
    /// Inode table capacity.
    pub inodes_total: usize,
    /// Data blocks in use.
    pub blocks_used: usize,
    /// Block pool capacity.
    pub blocks_total: usize,
    /// Handles currently open.
    pub handles_open: usize,
    /// Open-file table capacity.
    pub handles_total: usize,
    /// Size of one data block in bytes.
    pub block_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
    }

    #[test]
    fn test_open_flags() {
        let plain = OpenFlags::open();
        assert!(!plain.create && !plain.truncate && !plain.append);

        let create = OpenFlags::create_truncate();
        assert!(create.create);
        assert!(create.truncate);
        assert!(!create.append);

        let append = OpenFlags::append();
        assert!(append.append);
        assert!(!append.create);
    }
}
