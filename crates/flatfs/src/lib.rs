//! # flatfs
//!
//! An in-memory, single-process filesystem engine exposing POSIX-like
//! operations over a flat, single-directory namespace. Key components:
//!
//! - [`FlatFs`] - The operations layer: open/read/write/close, hard and
//!   symbolic links, unlink, copy-in from an external byte source
//! - [`BlockPool`](block_pool::BlockPool) - Fixed-capacity pool of
//!   fixed-size data blocks
//! - [`InodeTable`](inode_table::InodeTable) - Fixed-capacity inode arena
//!   with generation-tagged slots
//! - [`OpenFileTable`](open_files::OpenFileTable) - Handle table binding
//!   cursors to inodes
//!
//! ## Design Decisions
//!
//! - **Preallocated everything**: all tables are sized by [`FsParams`] at
//!   engine creation and never grow; exhaustion is an ordinary error, not
//!   an allocation.
//! - **Flat namespace**: paths are absolute and name exactly one entry in
//!   the root directory; no hierarchy is interpreted past the leading `/`.
//! - **Single-block files**: a file owns at most one data block; writes
//!   beyond it are dropped with a short count.
//! - **Per-resource locking**: one lock per inode, one per handle cursor,
//!   acquired in a fixed global order, so operations on distinct files
//!   never contend and no path can deadlock.
//! - **Lazy one-hop symlinks**: a link stores its target path verbatim and
//!   resolves it only when opened.

pub mod block_pool;
pub mod dir;
pub mod error;
pub mod fs;
pub mod inode_table;
pub mod open_files;
pub mod params;
pub mod types;

pub use dir::{DirEntry, MAX_NAME_LEN};
pub use error::{FsError, FsResult, Resource};
pub use fs::{FlatFs, ROOT_DIR_INUM};
pub use open_files::Handle;
pub use params::FsParams;
pub use types::{FileType, FsStats, OpenFlags};
