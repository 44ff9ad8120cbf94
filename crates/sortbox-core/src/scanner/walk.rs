use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, warn};

use super::top_k::TopKFileTracker;
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::fsys::{EntryKind, FileSystem};
use crate::model::DirCounts;

/// Everything learned about one top-level directory of SOURCE.
#[derive(Debug, Default)]
pub struct SubtreeSummary {
    pub counts: DirCounts,
    pub sample_children: Vec<String>,
    pub top_files: TopKFileTracker,
    pub extension_counts: HashMap<String, usize>,
    pub unreadable: bool,
}

pub fn is_ignored(name: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| p.matches(name))
}

/// Lowercased extension used for aggregate counts.
pub fn extension_key(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Walk the whole subtree under `root` with an explicit directory stack.
///
/// Links are counted as files and never followed; a directory whose
/// identity was already visited is not entered again. An unreadable nested
/// directory is skipped, an unreadable `root` marks the summary unreadable.
pub fn walk_subtree(
    fs: &dyn FileSystem,
    root: &Path,
    sample_limit: usize,
    ignore_patterns: &[Pattern],
    cancel: &CancelToken,
) -> Result<SubtreeSummary, Error> {
    let mut summary = SubtreeSummary::default();
    let mut visited = HashSet::new();
    if let Ok(entry) = fs.entry(root) {
        if let Some(identity) = entry.identity {
            visited.insert(identity);
        }
    }

    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut children = match fs.list_dir(&dir) {
            Ok(children) => children,
            Err(err) if dir == root => {
                warn!("Unreadable directory {}: {}", dir.display(), err);
                return Ok(SubtreeSummary {
                    unreadable: true,
                    ..SubtreeSummary::default()
                });
            }
            Err(err) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), err);
                continue;
            }
        };
        children.retain(|c| !is_ignored(&c.name, ignore_patterns));
        children.sort_by(|a, b| a.name.cmp(&b.name));

        if dir == root {
            summary.sample_children = children
                .iter()
                .take(sample_limit)
                .map(|c| c.name.clone())
                .collect();
        }

        let mut subdirs = Vec::new();
        for child in children {
            match child.kind {
                EntryKind::Directory => {
                    summary.counts.directories += 1;
                    let fresh = match &child.identity {
                        Some(identity) => visited.insert(identity.clone()),
                        None => true,
                    };
                    if fresh {
                        subdirs.push(child.path);
                    } else {
                        debug!("Already visited {}, not descending", child.path.display());
                    }
                }
                EntryKind::Symlink => {
                    summary.counts.files += 1;
                }
                EntryKind::File | EntryKind::Other => {
                    summary.counts.files += 1;
                    if let Some(ext) = extension_key(&child.name) {
                        *summary.extension_counts.entry(ext).or_default() += 1;
                    }
                    summary.top_files.observe(child.size, child.name);
                }
            }
        }
        // Reverse so the sorted-first directory is popped first.
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(summary)
}
