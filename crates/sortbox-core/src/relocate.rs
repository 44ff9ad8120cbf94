//! Whole-item relocation: rename when the provider can, otherwise
//! copy, verify, then delete the source.
//!
//! The source is only removed after the copy is complete and matches it
//! file for file, so an interruption can leave a duplicate but never loses
//! data.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fsys::{EntryKind, FileSystem};
use crate::platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Renamed,
    Copied,
    /// Copied and verified, but the source could not be fully removed.
    CopiedSourceKept,
}

/// Move `from` (file, link or whole directory) to `to`. `to` must not exist.
pub fn relocate(fs: &dyn FileSystem, from: &Path, to: &Path) -> io::Result<Relocation> {
    if to.starts_with(from) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is inside {}", to.display(), from.display()),
        ));
    }
    if fs.entry(to).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }

    match fs.rename(from, to) {
        Ok(()) => return Ok(Relocation::Renamed),
        Err(err) if platform::is_cross_device(&err) => {
            debug!(
                "Rename {} -> {} not possible ({}), copying",
                from.display(),
                to.display(),
                err
            );
        }
        Err(err) => return Err(err),
    }

    let source = fs.entry(from)?;
    if let Err(err) = copy_item(fs, from, to).and_then(|_| verify_copy(fs, from, to)) {
        discard_partial(fs, to);
        return Err(err);
    }

    let removed = match source.kind {
        EntryKind::Directory => fs.remove_dir_all(from),
        _ => fs.remove_file(from),
    };
    match removed {
        Ok(()) => Ok(Relocation::Copied),
        Err(err) => {
            warn!(
                "Copied {} to {} but could not remove the source: {}",
                from.display(),
                to.display(),
                err
            );
            Ok(Relocation::CopiedSourceKept)
        }
    }
}

fn discard_partial(fs: &dyn FileSystem, to: &Path) {
    let Ok(entry) = fs.entry(to) else {
        return;
    };
    let result = match entry.kind {
        EntryKind::Directory => fs.remove_dir_all(to),
        _ => fs.remove_file(to),
    };
    if let Err(err) = result {
        warn!("Could not remove partial copy {}: {}", to.display(), err);
    }
}

fn copy_item(fs: &dyn FileSystem, from: &Path, to: &Path) -> io::Result<()> {
    let root = fs.entry(from)?;
    match root.kind {
        EntryKind::Directory => {}
        EntryKind::Symlink => return fs.copy_link(from, to),
        _ => return fs.copy_file(from, to).map(|_| ()),
    }

    fs.create_dir(to)?;
    let mut stack: Vec<(PathBuf, PathBuf)> = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src_dir, dst_dir)) = stack.pop() {
        for child in fs.list_dir(&src_dir)? {
            let target = dst_dir.join(&child.name);
            match child.kind {
                EntryKind::Directory => {
                    fs.create_dir(&target)?;
                    stack.push((child.path, target));
                }
                EntryKind::Symlink => fs.copy_link(&child.path, &target)?,
                EntryKind::File | EntryKind::Other => {
                    fs.copy_file(&child.path, &target)?;
                }
            }
        }
    }
    Ok(())
}

/// Sorted `(relative path, kind, size)` of everything under `root`.
fn manifest(fs: &dyn FileSystem, root: &Path) -> io::Result<Vec<(String, EntryKind, u64)>> {
    let top = fs.entry(root)?;
    if top.kind != EntryKind::Directory {
        return Ok(vec![(String::new(), top.kind, top.size)]);
    }
    let mut items = Vec::new();
    let mut stack = vec![(root.to_path_buf(), String::new())];
    while let Some((dir, prefix)) = stack.pop() {
        for child in fs.list_dir(&dir)? {
            let rel = if prefix.is_empty() {
                child.name.clone()
            } else {
                format!("{prefix}/{}", child.name)
            };
            if child.kind == EntryKind::Directory {
                stack.push((child.path.clone(), rel.clone()));
            }
            items.push((rel, child.kind, child.size));
        }
    }
    items.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(items)
}

fn verify_copy(fs: &dyn FileSystem, from: &Path, to: &Path) -> io::Result<()> {
    let expected = manifest(fs, from)?;
    let actual = manifest(fs, to)?;
    if expected == actual {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "copy of {} is incomplete ({} of {} entries match)",
                from.display(),
                actual.iter().filter(|a| expected.contains(a)).count(),
                expected.len()
            ),
        ))
    }
}
