//! The operations layer: POSIX-like calls over the shared tables.
//!
//! One `FlatFs` value owns all preallocated state. The locking protocol:
//!
//! - `create_lock` serializes only the lookup-then-create decision in
//!   [`open`](FlatFs::open); it is never held across I/O.
//! - Each inode slot's `RwLock` guards that inode's size and block
//!   reference.
//! - Each handle's cursor has its own lock, taken after the inode's.
//! - Fixed acquisition order everywhere: handle slot (pin) → inode →
//!   cursor → block. Operations on distinct inumbers never contend.

use std::io::{self, Read};
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::block_pool::BlockPool;
use crate::dir::{DirStore, MAX_NAME_LEN};
use crate::error::{FsError, FsResult};
use crate::inode_table::InodeTable;
use crate::open_files::{Handle, OpenFileTable};
use crate::params::FsParams;
use crate::types::{FileType, FsStats, OpenFlags};

/// Inumber of the root directory, fixed at engine creation.
pub const ROOT_DIR_INUM: u32 = 0;

/// Check that a path is absolute and names exactly one flat entry, and
/// return that name.
fn valid_pathname(path: &str) -> FsResult<&str> {
    let name = match path.strip_prefix('/') {
        Some(name) if !name.is_empty() => name,
        _ => return Err(FsError::invalid_path(path)),
    };
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::invalid_path(path));
    }
    Ok(name)
}

/// In-memory, single-process filesystem engine over a flat namespace.
///
/// All tables are preallocated for the lifetime of the value; dropping it
/// releases everything. Independent instances do not share state.
pub struct FlatFs {
    params: FsParams,
    inodes: InodeTable,
    blocks: BlockPool,
    dir: DirStore,
    open_files: OpenFileTable,
    /// Serializes the exists-vs-create decision in `open`.
    create_lock: Mutex<()>,
}

impl FlatFs {
    /// Create an engine with the given table capacities.
    pub fn new(params: FsParams) -> FsResult<Self> {
        params.validate()?;
        let fs = Self {
            inodes: InodeTable::new(params.max_inode_count),
            blocks: BlockPool::new(params.max_block_count, params.block_size),
            dir: DirStore::new(params.block_size),
            open_files: OpenFileTable::new(params.max_open_files_count),
            create_lock: Mutex::new(()),
            params,
        };
        let root = fs
            .inodes
            .alloc(FileType::Directory)
            .expect("fresh inode table cannot be full");
        assert_eq!(
            root, ROOT_DIR_INUM,
            "root directory must land at inumber {ROOT_DIR_INUM}"
        );
        debug!(?params, "engine created");
        Ok(fs)
    }

    /// Create an engine with the default capacities.
    pub fn with_defaults() -> FsResult<Self> {
        Self::new(FsParams::default())
    }

    pub fn params(&self) -> &FsParams {
        &self.params
    }

    /// Resolve an absolute path to an inumber through the flat directory.
    fn lookup(&self, path: &str) -> FsResult<u32> {
        let name = valid_pathname(path)?;
        self.dir
            .find(name)
            .ok_or_else(|| FsError::not_found(path))
    }

    /// Whether a name currently resolves. Never mutates anything.
    pub fn exists(&self, path: &str) -> bool {
        valid_pathname(path)
            .ok()
            .and_then(|name| self.dir.find(name))
            .is_some()
    }

    /// Open a file, returning a handle.
    ///
    /// With `create`, a missing name is created; exactly one of two
    /// concurrent creators of the same name wins, the other opens the
    /// created file. A symlink is resolved one hop at this point: a missing
    /// target fails `NotFound`, a target that is itself a symlink fails
    /// `TooManyLinks`. With `truncate`, existing content is discarded and
    /// the block returned to the pool. The cursor starts at end of data
    /// with `append`, else at 0.
    ///
    /// Partial failure: when the handle table is exhausted after a create,
    /// the file remains created and the error is returned.
    pub fn open(&self, path: &str, flags: OpenFlags) -> FsResult<Handle> {
        let name = valid_pathname(path)?;

        let serializer = self.create_lock.lock();
        let mut created = false;
        let (inum, cursor) = match self.dir.find(name) {
            Some(inum) => {
                // The name exists, so the inumber is stable: stop
                // serializing before any further work.
                drop(serializer);
                let inum = self.resolve_symlink(path, inum)?;
                if flags.truncate {
                    self.truncate_inode(path, inum)?;
                }
                let cursor = if flags.append {
                    self.inodes
                        .get(inum)
                        .map(|inode| inode.size)
                        .ok_or_else(|| FsError::not_found(path))?
                } else {
                    0
                };
                (inum, cursor)
            }
            None if flags.create => {
                let inum = self.inodes.alloc(FileType::File)?;
                if let Err(err) = self.dir.insert(name, inum) {
                    // Roll the inode back; the directory is full.
                    self.inodes.free(inum);
                    return Err(err);
                }
                drop(serializer);
                created = true;
                debug!(path, inum, "created file");
                (inum, 0)
            }
            None => return Err(FsError::not_found(path)),
        };

        let generation = self
            .inodes
            .generation(inum)
            .ok_or_else(|| FsError::not_found(path))?;
        let handle = self.open_files.open(inum, generation, cursor).inspect_err(|_| {
            if created {
                warn!(path, inum, "handle table full; created file left in place");
            }
        })?;
        trace!(path, handle, inum, "open");
        Ok(handle)
    }

    /// One-hop symlink resolution at open time.
    fn resolve_symlink(&self, path: &str, inum: u32) -> FsResult<u32> {
        let target = {
            let inode = self
                .inodes
                .get(inum)
                .ok_or_else(|| FsError::not_found(path))?;
            if !inode.is_symlink {
                return Ok(inum);
            }
            let bnum = inode.block.expect("symlink inode must own its target block");
            let len = inode.size;
            self.blocks
                .with_block(bnum, |data| String::from_utf8_lossy(&data[..len]).into_owned())
        };
        let target_inum = self.lookup(&target)?;
        let chained = self
            .inodes
            .get(target_inum)
            .is_some_and(|inode| inode.is_symlink);
        if chained {
            return Err(FsError::TooManyLinks(path.to_string()));
        }
        trace!(path, target, "symlink resolved");
        Ok(target_inum)
    }

    /// Discard an inode's content and return its block to the pool.
    fn truncate_inode(&self, path: &str, inum: u32) -> FsResult<()> {
        let mut inode = self
            .inodes
            .get_mut(inum)
            .ok_or_else(|| FsError::not_found(path))?;
        if inode.size > 0 {
            if let Some(bnum) = inode.block.take() {
                self.blocks.free(bnum);
            }
            inode.size = 0;
        }
        Ok(())
    }

    /// Release a handle. The inode's existence and link count are
    /// untouched.
    pub fn close(&self, handle: Handle) -> FsResult<()> {
        self.open_files.close(handle)?;
        trace!(handle, "close");
        Ok(())
    }

    /// Read up to `buf.len()` bytes at the handle's cursor, advancing it.
    ///
    /// Returns the number of bytes transferred; 0 signals end of data.
    /// A handle whose inode has been reclaimed fails `InvalidHandle`.
    pub fn read(&self, handle: Handle, buf: &mut [u8]) -> FsResult<usize> {
        self.open_files.with_entry(handle, |entry| {
            let inode = self
                .inodes
                .get_checked(entry.inum(), entry.generation())
                .ok_or(FsError::InvalidHandle(handle))?;
            let mut cursor = entry.cursor().lock();
            let available = inode.size.saturating_sub(*cursor);
            let to_read = available.min(buf.len());
            if to_read > 0 {
                let bnum = inode.block.expect("sized file must own a block");
                self.blocks.with_block(bnum, |data| {
                    buf[..to_read].copy_from_slice(&data[*cursor..*cursor + to_read]);
                });
                *cursor += to_read;
            }
            trace!(handle, bytes = to_read, "read");
            Ok(to_read)
        })?
    }

    /// Write up to `buf.len()` bytes at the handle's cursor, advancing it.
    ///
    /// A file holds a single block: bytes beyond `block_size` are silently
    /// dropped and the short count returned. The first write to an empty
    /// file allocates its block under the inode lock, which stays held
    /// through the size update. Writing through a handle bound to a
    /// symlink inode is a no-op returning 0.
    pub fn write(&self, handle: Handle, buf: &[u8]) -> FsResult<usize> {
        let block_size = self.params.block_size;
        self.open_files.with_entry(handle, |entry| {
            let mut inode = self
                .inodes
                .get_mut_checked(entry.inum(), entry.generation())
                .ok_or(FsError::InvalidHandle(handle))?;
            if inode.is_symlink {
                return Ok(0);
            }
            let mut cursor = entry.cursor().lock();
            let to_write = buf.len().min(block_size.saturating_sub(*cursor));
            if to_write == 0 {
                return Ok(0);
            }
            let bnum = match inode.block {
                Some(bnum) => bnum,
                None => {
                    let bnum = self.blocks.alloc()?;
                    inode.block = Some(bnum);
                    bnum
                }
            };
            self.blocks.with_block_mut(bnum, |data| {
                data[*cursor..*cursor + to_write].copy_from_slice(&buf[..to_write]);
            });
            *cursor += to_write;
            if *cursor > inode.size {
                inode.size = *cursor;
            }
            trace!(handle, bytes = to_write, "write");
            Ok(to_write)
        })?
    }

    /// Drain a handle to end of data.
    pub fn read_to_vec(&self, handle: Handle) -> FsResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = vec![0u8; self.params.block_size];
        loop {
            let n = self.read(handle, &mut chunk)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }

    /// Create a second directory entry aliasing the target's inode.
    ///
    /// Hard-linking a symlink is refused. A duplicate link name or a full
    /// directory fails with nothing mutated.
    pub fn link(&self, target_path: &str, link_path: &str) -> FsResult<()> {
        let link_name = valid_pathname(link_path)?;
        let target_inum = self.lookup(target_path)?;

        let mut inode = self
            .inodes
            .get_mut(target_inum)
            .ok_or_else(|| FsError::not_found(target_path))?;
        if inode.is_symlink {
            return Err(FsError::invalid_operation(
                "cannot hard-link a symbolic link",
            ));
        }
        self.dir.insert(link_name, target_inum)?;
        inode.nlink += 1;
        debug!(target_path, link_path, inum = target_inum, "hard link");
        Ok(())
    }

    /// Create a symbolic link to an existing target.
    ///
    /// The literal target path is stored in the link inode's block and only
    /// interpreted when the link is opened. A target path that does not fit
    /// in one block is refused.
    pub fn symlink(&self, target_path: &str, link_path: &str) -> FsResult<()> {
        self.lookup(target_path)?;
        if target_path.len() >= self.params.block_size {
            return Err(FsError::invalid_operation(format!(
                "symlink target does not fit in one block: {target_path}"
            )));
        }

        let handle = self.open(link_path, OpenFlags::create())?;
        self.close(handle)?;

        let link_name = valid_pathname(link_path)?;
        let inum = self
            .dir
            .find(link_name)
            .ok_or_else(|| FsError::not_found(link_path))?;
        let mut inode = self
            .inodes
            .get_mut(inum)
            .ok_or_else(|| FsError::not_found(link_path))?;
        let bnum = match inode.block {
            Some(bnum) => bnum,
            None => {
                let bnum = self.blocks.alloc()?;
                inode.block = Some(bnum);
                bnum
            }
        };
        self.blocks.with_block_mut(bnum, |data| {
            data[..target_path.len()].copy_from_slice(target_path.as_bytes());
        });
        inode.size = target_path.len();
        inode.is_symlink = true;
        debug!(target_path, link_path, inum, "symlink");
        Ok(())
    }

    /// Remove a name from the directory, reclaiming the inode once its
    /// last name is gone.
    ///
    /// The entry is removed first; only then is the link count dropped and,
    /// at zero, the block and inode returned to their pools. The directory
    /// therefore never names an already-reclaimed inode.
    pub fn unlink(&self, path: &str) -> FsResult<()> {
        let name = valid_pathname(path)?;
        let inum = self
            .dir
            .remove(name)
            .ok_or_else(|| FsError::not_found(path))?;

        let freed_block = {
            let mut inode = self
                .inodes
                .get_mut(inum)
                .ok_or_else(|| FsError::not_found(path))?;
            inode.nlink = inode.nlink.saturating_sub(1);
            if inode.nlink > 0 {
                debug!(path, inum, nlink = inode.nlink, "unlink, alias remains");
                return Ok(());
            }
            inode.block.take()
        };
        if let Some(bnum) = freed_block {
            self.blocks.free(bnum);
        }
        self.inodes.free(inum);
        debug!(path, inum, "unlink, inode reclaimed");
        Ok(())
    }

    /// Stream an external byte source into a file.
    ///
    /// The destination is opened with create + truncate, chunks are pulled
    /// from `source` and written until it is exhausted or a write fails,
    /// and the destination handle is closed on every path. No engine lock
    /// is held while waiting on the source. Bytes past the single-block
    /// capacity are dropped by the write path as usual.
    pub fn copy_from_external<R: Read>(&self, source: &mut R, dest_path: &str) -> FsResult<()> {
        let handle = self.open(dest_path, OpenFlags::create_truncate())?;
        let mut chunk = vec![0u8; self.params.block_size];
        let result = loop {
            let n = match source.read(&mut chunk) {
                Ok(0) => break Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(FsError::HostIo(e)),
            };
            if let Err(e) = self.write(handle, &chunk[..n]) {
                break Err(e);
            }
        };
        self.close(handle)?;
        if result.is_ok() {
            debug!(dest_path, "copy from external source complete");
        }
        result
    }

    /// Copy a host file into the engine.
    pub fn copy_from_host_file(
        &self,
        source_path: impl AsRef<Path>,
        dest_path: &str,
    ) -> FsResult<()> {
        let mut file = std::fs::File::open(source_path)?;
        self.copy_from_external(&mut file, dest_path)
    }

    /// Usage counters for all preallocated tables.
    pub fn stats(&self) -> FsStats {
        FsStats {
            inodes_used: self.inodes.used(),
            inodes_total: self.inodes.capacity(),
            blocks_used: self.blocks.used(),
            blocks_total: self.blocks.capacity(),
            handles_open: self.open_files.open_count(),
            handles_total: self.open_files.capacity(),
            block_size: self.params.block_size,
        }
    }
}
