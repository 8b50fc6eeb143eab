//! Fixed-capacity pool of data blocks.

use parking_lot::{Mutex, RwLock};

use crate::error::{FsError, FsResult, Resource};

/// Preallocated arena of fixed-size byte buffers.
///
/// A block index is owned by exactly one inode at a time; ownership moves
/// through [`alloc`](BlockPool::alloc) and [`free`](BlockPool::free).
/// Content is accessed through closures under the block's own lock.
pub struct BlockPool {
    blocks: Vec<RwLock<Box<[u8]>>>,
    free: Mutex<Vec<u32>>,
    block_size: usize,
}

impl BlockPool {
    pub fn new(count: u32, block_size: usize) -> Self {
        let blocks = (0..count)
            .map(|_| RwLock::new(vec![0u8; block_size].into_boxed_slice()))
            .collect();
        // Lowest index first, like a fresh disk.
        let free = (0..count).rev().collect();
        Self {
            blocks,
            free: Mutex::new(free),
            block_size,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    pub fn used(&self) -> usize {
        self.blocks.len() - self.free.lock().len()
    }

    /// Take a free block out of the pool. The index belongs to the caller
    /// until it is passed back to [`free`](BlockPool::free).
    pub fn alloc(&self) -> FsResult<u32> {
        self.free
            .lock()
            .pop()
            .ok_or(FsError::NoSpace(Resource::Blocks))
    }

    /// Return a block to the pool. Contents are zeroed so the next owner
    /// never observes stale bytes.
    pub fn free(&self, bnum: u32) {
        let mut block = self.blocks[bnum as usize].write();
        block.fill(0);
        drop(block);
        let mut free = self.free.lock();
        debug_assert!(!free.contains(&bnum), "double free of block {bnum}");
        free.push(bnum);
    }

    /// Read the block's bytes under its lock.
    pub fn with_block<R>(&self, bnum: u32, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.blocks[bnum as usize].read())
    }

    /// Mutate the block's bytes under its lock.
    pub fn with_block_mut<R>(&self, bnum: u32, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.blocks[bnum as usize].write())
    }
}
