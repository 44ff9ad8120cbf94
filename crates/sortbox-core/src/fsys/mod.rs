//! Storage capability set the core depends on.
//!
//! Scanning, execution and undo only talk to a [`FileSystem`]; [`LocalFs`]
//! is the concrete implementation for local disks. Other providers
//! (sandboxed document stores, test doubles) implement the same trait.

mod local;

pub use local::LocalFs;

use std::io;
use std::path::{Path, PathBuf};

use crate::platform::FileIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Metadata of one directory child. Links are reported as links, never
/// resolved.
#[derive(Debug, Clone)]
pub struct ChildEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub identity: Option<FileIdentity>,
}

pub trait FileSystem: Send + Sync {
    /// Enumerate the direct children of `dir`.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>>;

    /// Metadata for a single path without following links.
    fn entry(&self, path: &Path) -> io::Result<ChildEntry>;

    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create one directory. Fails if the parent is missing.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Same-volume move. Providers that cannot move return an error for
    /// which [`crate::platform::is_cross_device`] is true.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Recreate a symbolic link at `to` pointing where `from` points.
    fn copy_link(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Find-child-by-name: exact match, no link following.
    fn child_exists(&self, dir: &Path, name: &str) -> bool {
        self.entry(&dir.join(name)).is_ok()
    }
}
