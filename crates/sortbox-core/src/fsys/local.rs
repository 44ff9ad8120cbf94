use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ChildEntry, EntryKind, FileSystem};
use crate::platform;

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    fn describe(path: PathBuf, metadata: &fs::Metadata) -> ChildEntry {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        let size = if kind == EntryKind::File {
            metadata.len()
        } else {
            0
        };
        let identity = if kind == EntryKind::Directory {
            platform::file_identity(&path, metadata)
        } else {
            None
        };
        ChildEntry {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path,
            kind,
            size,
            identity,
        }
    }
}

impl FileSystem for LocalFs {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            match fs::symlink_metadata(&path) {
                Ok(metadata) => children.push(Self::describe(path, &metadata)),
                Err(err) => {
                    tracing::warn!("Error getting metadata for {}: {}", path.display(), err);
                }
            }
        }
        Ok(children)
    }

    fn entry(&self, path: &Path) -> io::Result<ChildEntry> {
        let metadata = fs::symlink_metadata(path)?;
        Ok(Self::describe(path.to_path_buf(), &metadata))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    fn copy_link(&self, from: &Path, to: &Path) -> io::Result<()> {
        let target = fs::read_link(from)?;
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, to)
        }
        #[cfg(windows)]
        {
            if fs::metadata(from).map(|m| m.is_dir()).unwrap_or(false) {
                std::os::windows::fs::symlink_dir(target, to)
            } else {
                std::os::windows::fs::symlink_file(target, to)
            }
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = (target, to);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "symbolic links are not supported on this platform",
            ))
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}
