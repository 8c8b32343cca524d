//! Inode numbers for remote paths.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Inode of the mount root.
pub const ROOT_INO: u64 = 1;

/// Bidirectional inode ↔ path table.
///
/// The device has no inode concept, so numbers are handed out on first
/// lookup and stay stable for the life of the mount.
#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, PathBuf>,
    inodes: HashMap<PathBuf, u64>,
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let root = PathBuf::from("/");
        let mut paths = HashMap::new();
        let mut inodes = HashMap::new();
        paths.insert(ROOT_INO, root.clone());
        inodes.insert(root, ROOT_INO);
        Self {
            paths,
            inodes,
            next: ROOT_INO + 1,
        }
    }

    pub fn path(&self, ino: u64) -> Option<&Path> {
        self.paths.get(&ino).map(PathBuf::as_path)
    }

    /// Path of `name` inside directory inode `parent`.
    pub fn child_path(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
        self.path(parent).map(|p| p.join(name))
    }

    /// Inode for `path`, allocating one if needed.
    pub fn get_or_insert(&mut self, path: PathBuf) -> u64 {
        if let Some(&ino) = self.inodes.get(&path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.clone());
        self.inodes.insert(path, ino);
        ino
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
