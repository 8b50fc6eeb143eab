//! Flat directory entry store.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult, Resource};

/// Longest name a directory entry can hold.
pub const MAX_NAME_LEN: usize = 40;

/// On-block footprint of one entry: the name field plus the inumber,
/// padded. Fixes the entry count that fits the root directory's block.
pub(crate) const DIR_ENTRY_SIZE: usize = 48;

/// A (name, inumber) pair in the root directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub inum: u32,
}

/// Single-level name → inumber mapping.
///
/// Typed rendition of the entry array the root directory inode keeps in its
/// block; capacity is `block_size / DIR_ENTRY_SIZE` and a `None` slot is
/// free. Names are unique.
pub struct DirStore {
    entries: RwLock<Vec<Option<DirEntry>>>,
}

impl DirStore {
    pub fn new(block_size: usize) -> Self {
        let capacity = block_size / DIR_ENTRY_SIZE;
        Self {
            entries: RwLock::new(vec![None; capacity]),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.read().len()
    }

    /// Look a name up, returning its inumber.
    pub fn find(&self, name: &str) -> Option<u32> {
        self.entries
            .read()
            .iter()
            .flatten()
            .find(|e| e.name == name)
            .map(|e| e.inum)
    }

    /// Insert a (name, inumber) pair. Fails when the name is already taken
    /// or no slot is free; either way nothing is mutated.
    pub fn insert(&self, name: &str, inum: u32) -> FsResult<()> {
        let mut entries = self.entries.write();
        if entries.iter().flatten().any(|e| e.name == name) {
            return Err(FsError::invalid_operation(format!(
                "name already exists: {name}"
            )));
        }
        match entries.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(DirEntry {
                    name: name.to_string(),
                    inum,
                });
                Ok(())
            }
            None => Err(FsError::NoSpace(Resource::DirEntries)),
        }
    }

    /// Remove a name, returning the inumber it mapped to.
    pub fn remove(&self, name: &str) -> Option<u32> {
        let mut entries = self.entries.write();
        for slot in entries.iter_mut() {
            if slot.as_ref().is_some_and(|e| e.name == name) {
                return slot.take().map(|e| e.inum);
            }
        }
        None
    }

    /// Snapshot of the live entries.
    pub fn list(&self) -> Vec<DirEntry> {
        self.entries.read().iter().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_find_remove() {
        let dir = DirStore::new(1024);
        dir.insert("a", 3).unwrap();
        dir.insert("b", 7).unwrap();

        assert_eq!(dir.find("a"), Some(3));
        assert_eq!(dir.find("missing"), None);

        assert_eq!(dir.remove("a"), Some(3));
        assert_eq!(dir.find("a"), None);
        assert_eq!(dir.remove("a"), None);
        assert_eq!(dir.list().len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let dir = DirStore::new(1024);
        dir.insert("a", 1).unwrap();
        assert!(matches!(
            dir.insert("a", 2),
            Err(FsError::InvalidOperation(_))
        ));
        // Original mapping untouched.
        assert_eq!(dir.find("a"), Some(1));
    }

    #[test]
    fn test_full_directory() {
        // 96 bytes → two entries.
        let dir = DirStore::new(96);
        assert_eq!(dir.capacity(), 2);
        dir.insert("a", 1).unwrap();
        dir.insert("b", 2).unwrap();
        assert!(matches!(
            dir.insert("c", 3),
            Err(FsError::NoSpace(Resource::DirEntries))
        ));

        // Freed slots are reusable.
        dir.remove("a");
        dir.insert("c", 3).unwrap();
        assert_eq!(dir.find("c"), Some(3));
    }
}
