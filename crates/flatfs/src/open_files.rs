//! Open-file handle table.

use parking_lot::{Mutex, RwLock};

use crate::error::{FsError, FsResult, Resource};

/// Caller-visible token referencing an open-file-table entry.
pub type Handle = usize;

/// One open file: a weak reference to an inode plus a cursor.
///
/// The entry does not own the inode — the inode can be reclaimed while this
/// entry is still open. Callers re-validate the (inumber, generation) pair
/// on every access. The cursor has its own lock, taken after the inode's.
#[derive(Debug)]
pub struct OpenFile {
    inum: u32,
    generation: u64,
    cursor: Mutex<usize>,
}

impl OpenFile {
    pub fn inum(&self) -> u32 {
        self.inum
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cursor(&self) -> &Mutex<usize> {
        &self.cursor
    }
}

/// Preallocated arena of handle slots with a free list.
///
/// A slot's `RwLock` guards the entry's existence: operations pin the entry
/// with a read lock for their duration, so a concurrent close blocks until
/// they finish instead of freeing the slot mid-operation.
pub struct OpenFileTable {
    slots: Vec<RwLock<Option<OpenFile>>>,
    free: Mutex<Vec<Handle>>,
}

impl OpenFileTable {
    pub fn new(count: u32) -> Self {
        let slots = (0..count).map(|_| RwLock::new(None)).collect();
        let free = (0..count as Handle).rev().collect();
        Self {
            slots,
            free: Mutex::new(free),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn open_count(&self) -> usize {
        self.slots.len() - self.free.lock().len()
    }

    /// Bind a fresh handle to (inumber, generation) with the given cursor.
    pub fn open(&self, inum: u32, generation: u64, cursor: usize) -> FsResult<Handle> {
        let handle = self
            .free
            .lock()
            .pop()
            .ok_or(FsError::NoSpace(Resource::Handles))?;
        *self.slots[handle].write() = Some(OpenFile {
            inum,
            generation,
            cursor: Mutex::new(cursor),
        });
        Ok(handle)
    }

    /// Release a handle. Waits for in-flight operations on it to finish.
    pub fn close(&self, handle: Handle) -> FsResult<()> {
        let slot = self
            .slots
            .get(handle)
            .ok_or(FsError::InvalidHandle(handle))?;
        let mut guard = slot.write();
        if guard.take().is_none() {
            return Err(FsError::InvalidHandle(handle));
        }
        drop(guard);
        self.free.lock().push(handle);
        Ok(())
    }

    /// Run `f` with the entry pinned open.
    pub fn with_entry<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&OpenFile) -> R,
    ) -> FsResult<R> {
        let slot = self
            .slots
            .get(handle)
            .ok_or(FsError::InvalidHandle(handle))?;
        let guard = slot.read();
        match guard.as_ref() {
            Some(entry) => Ok(f(entry)),
            None => Err(FsError::InvalidHandle(handle)),
        }
    }
}
