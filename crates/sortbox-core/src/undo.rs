//! Reverse replay of a move log.
//!
//! Operations are undone last-first so nested or repeated destinations
//! unwind in the opposite order they were created. A missing destination is
//! a per-item failure, never a reason to stop.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{SkipReason, SkipRecord};
use crate::executor::rel_to_path;
use crate::fsys::{EntryKind, FileSystem};
use crate::model::{MoveLog, MoveOp};
use crate::names::unique_child_name;
use crate::progress::ProgressReporter;
use crate::relocate::relocate;

#[derive(Debug, Clone, Copy, Default)]
pub struct UndoOptions {
    /// Leave folders the apply created in LIBRARY even when the restore
    /// empties them. By default they are removed so LIBRARY returns to its
    /// pre-apply content.
    pub keep_created_folders: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreRecord {
    pub source_rel: String,
    pub destination_rel: String,
    /// Name the item got back in SOURCE; differs from `source_rel` when
    /// something new took its place in the meantime.
    pub restored_rel: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UndoReport {
    pub restored: Vec<RestoreRecord>,
    pub failures: Vec<SkipRecord>,
    pub removed_folders: Vec<String>,
    pub cancelled: bool,
}

pub struct UndoEngine<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> UndoEngine<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// `created_folders` are the LIBRARY folders the apply recorded as made
    /// by itself; no other folder is ever removed.
    pub fn undo(
        &self,
        log: &MoveLog,
        created_folders: &[String],
        options: &UndoOptions,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> UndoReport {
        let start = Instant::now();
        let source_root = Path::new(&log.source_root);
        let library_root = Path::new(&log.library_root);
        let total = log.operations.len();
        let mut report = UndoReport::default();

        info!("Undoing {} operations from {}", total, log.executed_at);
        reporter.on_undo_start(total);

        for (done, op) in log.operations.iter().rev().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report
                    .failures
                    .push(SkipRecord::new(op.destination_rel.clone(), &SkipReason::Cancelled));
                continue;
            }

            match self.restore(source_root, library_root, op) {
                Ok(restored_rel) => {
                    debug!("{} -> {}", op.destination_rel, restored_rel);
                    report.restored.push(RestoreRecord {
                        source_rel: op.source_rel.clone(),
                        destination_rel: op.destination_rel.clone(),
                        restored_rel,
                    });
                }
                Err(reason) => {
                    warn!("Cannot restore {}: {}", op.destination_rel, reason);
                    report
                        .failures
                        .push(SkipRecord::new(op.destination_rel.clone(), &reason));
                }
            }
            reporter.on_undo_progress(done + 1, total, &op.destination_rel);
        }

        if !options.keep_created_folders && !report.cancelled {
            report.removed_folders = self.remove_created(library_root, created_folders);
        }

        let duration = start.elapsed();
        info!(
            "Undo finished in {:.2}s: {} restored, {} failed",
            duration.as_secs_f64(),
            report.restored.len(),
            report.failures.len()
        );
        reporter.on_undo_complete(
            report.restored.len(),
            report.failures.len(),
            duration.as_secs_f64(),
        );
        report
    }

    fn restore(
        &self,
        source_root: &Path,
        library_root: &Path,
        op: &MoveOp,
    ) -> Result<String, SkipReason> {
        let destination = checked_join(library_root, &op.destination_rel)
            .ok_or_else(|| SkipReason::RestoreFailed("unsafe path in log".to_string()))?;
        let original = checked_join(source_root, &op.source_rel)
            .ok_or_else(|| SkipReason::RestoreFailed("unsafe path in log".to_string()))?;

        let entry = self
            .fs
            .entry(&destination)
            .map_err(|_| SkipReason::DestinationNotFound)?;

        let parent = original.parent().unwrap_or(source_root);
        let candidate = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| op.source_rel.clone());
        let is_dir = entry.kind == EntryKind::Directory;
        let name = unique_child_name(self.fs, parent, &candidate, is_dir)
            .map_err(|e| SkipReason::RestoreFailed(e.to_string()))?;

        relocate(self.fs, &destination, &parent.join(&name))
            .map_err(|e| SkipReason::RestoreFailed(e.to_string()))?;

        Ok(match op.source_rel.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{name}"),
            None => name,
        })
    }

    /// Remove created folders that are empty again, deepest first. The
    /// LIBRARY root is never a candidate.
    fn remove_created(&self, library_root: &Path, created: &[String]) -> Vec<String> {
        let unique: BTreeSet<&String> = created.iter().collect();
        let mut ordered: Vec<&String> = unique.into_iter().collect();
        ordered.sort_by_key(|rel| std::cmp::Reverse(rel.matches('/').count()));

        let mut removed = Vec::new();
        for rel in ordered {
            let Some(dir) = checked_join(library_root, rel) else {
                continue;
            };
            let empty = self
                .fs
                .list_dir(&dir)
                .map(|children| children.is_empty())
                .unwrap_or(false);
            if empty && self.fs.remove_dir(&dir).is_ok() {
                debug!("Removed created folder {}", rel);
                removed.push(rel.clone());
            }
        }
        removed
    }
}

/// Join a logged relative path onto `root`, refusing anything that could
/// step outside it.
fn checked_join(root: &Path, rel: &str) -> Option<PathBuf> {
    let joined = rel_to_path(Path::new(""), rel);
    let safe = joined.components().count() > 0
        && joined
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    safe.then(|| root.join(joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_paths() {
        let root = Path::new("/lib");
        assert!(checked_join(root, "../etc/passwd").is_none());
        assert!(checked_join(root, "").is_none());
        assert!(checked_join(root, "Docs/./a").is_some());
        assert_eq!(
            checked_join(root, "Docs/a.pdf"),
            Some(root.join("Docs").join("a.pdf"))
        );
    }
}
