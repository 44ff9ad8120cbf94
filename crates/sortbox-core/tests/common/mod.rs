#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sortbox_core::fsys::{ChildEntry, FileSystem, LocalFs};
use sortbox_core::AppConfig;
use walkdir::WalkDir;

pub fn write_file(path: &Path, bytes: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![b'x'; bytes]).unwrap();
}

/// Every file and folder under `root` as `rel/path -> size` (folders are
/// `-1`), in a stable order.
pub fn snapshot(root: &Path) -> BTreeMap<String, i64> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            let size = if e.file_type().is_dir() {
                -1
            } else {
                e.metadata().unwrap().len() as i64
            };
            (rel, size)
        })
        .collect()
}

pub fn config_with_workspace(workspace: &Path) -> AppConfig {
    AppConfig {
        workspace_dir: Some(workspace.to_string_lossy().into_owned()),
        ..AppConfig::default()
    }
}

/// Local disk, except that listing the given directories fails.
pub struct UnreadableDirsFs {
    pub unreadable: Vec<PathBuf>,
}

impl FileSystem for UnreadableDirsFs {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>> {
        if self.unreadable.iter().any(|p| p == dir) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        LocalFs.list_dir(dir)
    }
    fn entry(&self, path: &Path) -> io::Result<ChildEntry> {
        LocalFs.entry(path)
    }
    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        LocalFs.read_link(path)
    }
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        LocalFs.create_dir(path)
    }
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        LocalFs.rename(from, to)
    }
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        LocalFs.copy_file(from, to)
    }
    fn copy_link(&self, from: &Path, to: &Path) -> io::Result<()> {
        LocalFs.copy_link(from, to)
    }
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_file(path)
    }
    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_dir(path)
    }
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_dir_all(path)
    }
}

/// Local disk that cannot rename, as if SOURCE and LIBRARY were on
/// different volumes.
pub struct NoRenameFs;

impl FileSystem for NoRenameFs {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>> {
        LocalFs.list_dir(dir)
    }
    fn entry(&self, path: &Path) -> io::Result<ChildEntry> {
        LocalFs.entry(path)
    }
    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        LocalFs.read_link(path)
    }
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        LocalFs.create_dir(path)
    }
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "cross-device"))
    }
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        LocalFs.copy_file(from, to)
    }
    fn copy_link(&self, from: &Path, to: &Path) -> io::Result<()> {
        LocalFs.copy_link(from, to)
    }
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_file(path)
    }
    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_dir(path)
    }
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_dir_all(path)
    }
}
