//! Fixed-capacity inode arena.

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use crate::error::{FsError, FsResult, Resource};
use crate::types::FileType;

/// Metadata record for a file or directory.
///
/// The slot's `RwLock` is the per-inode lock: it guards `size` and `block`
/// against concurrent writers on other handles.
#[derive(Debug, Clone)]
pub struct Inode {
    pub kind: FileType,
    /// Bytes of live data in the block.
    pub size: usize,
    /// Single data block reference; `None` until the first write.
    pub block: Option<u32>,
    /// Directory entries aliasing this inode. Zero triggers reclamation.
    pub nlink: u32,
    /// The block holds a target path instead of data.
    pub is_symlink: bool,
}

impl Inode {
    fn new(kind: FileType) -> Self {
        Self {
            kind,
            size: 0,
            block: None,
            nlink: 1,
            is_symlink: false,
        }
    }
}

#[derive(Debug)]
struct Slot {
    /// Bumped on every free; stale inumber references fail the tag check.
    generation: u64,
    inode: Option<Inode>,
}

/// Preallocated arena of inode slots with a free list.
pub struct InodeTable {
    slots: Vec<RwLock<Slot>>,
    free: Mutex<Vec<u32>>,
}

impl InodeTable {
    pub fn new(count: u32) -> Self {
        let slots = (0..count)
            .map(|_| {
                RwLock::new(Slot {
                    generation: 0,
                    inode: None,
                })
            })
            .collect();
        let free = (0..count).rev().collect();
        Self {
            slots,
            free: Mutex::new(free),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used(&self) -> usize {
        self.slots.len() - self.free.lock().len()
    }

    /// Allocate a fresh inode of the given kind, link count 1.
    pub fn alloc(&self, kind: FileType) -> FsResult<u32> {
        let inum = self
            .free
            .lock()
            .pop()
            .ok_or(FsError::NoSpace(Resource::Inodes))?;
        self.slots[inum as usize].write().inode = Some(Inode::new(kind));
        Ok(inum)
    }

    /// Release the inode record. The caller frees the data block beforehand.
    pub fn free(&self, inum: u32) {
        let mut slot = self.slots[inum as usize].write();
        debug_assert!(slot.inode.is_some(), "double free of inode {inum}");
        slot.inode = None;
        slot.generation = slot.generation.wrapping_add(1);
        drop(slot);
        self.free.lock().push(inum);
    }

    /// Current generation tag of the slot, live or not.
    pub fn generation(&self, inum: u32) -> Option<u64> {
        Some(self.slots.get(inum as usize)?.read().generation)
    }

    /// Shared access to a live inode.
    pub fn get(&self, inum: u32) -> Option<MappedRwLockReadGuard<'_, Inode>> {
        let slot = self.slots.get(inum as usize)?.read();
        RwLockReadGuard::try_map(slot, |s| s.inode.as_ref()).ok()
    }

    /// Exclusive access to a live inode.
    pub fn get_mut(&self, inum: u32) -> Option<MappedRwLockWriteGuard<'_, Inode>> {
        let slot = self.slots.get(inum as usize)?.write();
        RwLockWriteGuard::try_map(slot, |s| s.inode.as_mut()).ok()
    }

    /// Shared access, refused when the generation tag no longer matches.
    pub fn get_checked(
        &self,
        inum: u32,
        generation: u64,
    ) -> Option<MappedRwLockReadGuard<'_, Inode>> {
        let slot = self.slots.get(inum as usize)?.read();
        RwLockReadGuard::try_map(slot, |s| {
            if s.generation == generation {
                s.inode.as_ref()
            } else {
                None
            }
        })
        .ok()
    }

    /// Exclusive access, refused when the generation tag no longer matches.
    pub fn get_mut_checked(
        &self,
        inum: u32,
        generation: u64,
    ) -> Option<MappedRwLockWriteGuard<'_, Inode>> {
        let slot = self.slots.get(inum as usize)?.write();
        RwLockWriteGuard::try_map(slot, |s| {
            if s.generation == generation {
                s.inode.as_mut()
            } else {
                None
            }
        })
        .ok()
    }
}
