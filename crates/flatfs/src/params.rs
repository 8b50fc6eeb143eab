//! Engine sizing parameters.

use serde::{Deserialize, Serialize};

use crate::dir::DIR_ENTRY_SIZE;
use crate::error::{FsError, FsResult};

/// Capacities of the engine's preallocated tables.
///
/// All tables are sized once at engine creation and never grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsParams {
    /// Inode table capacity.
    pub max_inode_count: u32,
    /// Data block pool capacity.
    pub max_block_count: u32,
    /// Open-file handle table capacity.
    pub max_open_files_count: u32,
    /// Size of one data block in bytes.
    pub block_size: usize,
}

impl Default for FsParams {
    fn default() -> Self {
        Self {
            max_inode_count: 64,
            max_block_count: 1024,
            max_open_files_count: 16,
            block_size: 1024,
        }
    }
}

impl FsParams {
    /// Reject capacities the engine cannot operate with.
    pub fn validate(&self) -> FsResult<()> {
        if self.max_inode_count == 0 {
            return Err(FsError::config("max_inode_count must be nonzero"));
        }
        if self.max_block_count == 0 {
            return Err(FsError::config("max_block_count must be nonzero"));
        }
        if self.max_open_files_count == 0 {
            return Err(FsError::config("max_open_files_count must be nonzero"));
        }
        if self.block_size < DIR_ENTRY_SIZE {
            return Err(FsError::config(format!(
                "block_size must be at least {DIR_ENTRY_SIZE} bytes to hold a directory entry"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = FsParams::default();
        assert_eq!(params.max_inode_count, 64);
        assert_eq!(params.max_block_count, 1024);
        assert_eq!(params.max_open_files_count, 16);
        assert_eq!(params.block_size, 1024);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacities() {
        let params = FsParams {
            max_inode_count: 0,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(FsError::Config(_))));

        let params = FsParams {
            block_size: 8,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(FsError::Config(_))));
    }
}
