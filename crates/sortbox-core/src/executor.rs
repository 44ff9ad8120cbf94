use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, SkipReason, SkipRecord};
use crate::fsys::{EntryKind, FileSystem};
use crate::model::{MoveLog, MoveOp, Placement, Plan};
use crate::names::unique_child_name;
use crate::progress::ProgressReporter;
use crate::relocate::{relocate, Relocation};
use crate::workspace::{MoveLogWriter, Workspace};

/// Outcome of one plan application.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub log: MoveLog,
    pub log_path: PathBuf,
    pub skipped: Vec<SkipRecord>,
    pub created_folders: Vec<String>,
    pub cancelled: bool,
}

impl ApplyReport {
    pub fn moved(&self) -> usize {
        self.log.operations.len()
    }
}

/// Library-relative `/`-separated path of a destination folder.
pub fn folder_rel(category: &str, subcategory: Option<&str>) -> String {
    match subcategory {
        Some(sub) => format!("{category}/{sub}"),
        None => category.to_string(),
    }
}

pub fn rel_to_path(root: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

struct RunState<'w> {
    writer: Mutex<MoveLogWriter<'w>>,
    skipped: Mutex<Vec<(usize, SkipRecord)>>,
    done: AtomicUsize,
    total: usize,
    halted: CancelToken,
}

/// Applies a validated plan to LIBRARY.
pub struct PlanExecutor<'a> {
    fs: &'a dyn FileSystem,
    workspace: &'a Workspace,
    parallel: bool,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(fs: &'a dyn FileSystem, workspace: &'a Workspace) -> Self {
        Self {
            fs,
            workspace,
            parallel: false,
        }
    }

    /// Run placements for distinct destination folders concurrently.
    /// Placements sharing a folder always run one after another.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn execute(
        &self,
        source_root: &Path,
        library_root: &Path,
        plan: &Plan,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<ApplyReport, Error> {
        let start = Instant::now();
        let writer = self.workspace.begin_move_log()?;
        let log_path = writer.path().to_path_buf();
        let state = RunState {
            writer: Mutex::new(writer),
            skipped: Mutex::new(Vec::new()),
            done: AtomicUsize::new(0),
            total: plan.placements.len(),
            halted: CancelToken::new(),
        };

        let mut skipped = Vec::new();
        for request in &plan.new_folders {
            let sub = request.target_subcategory();
            if let Err(err) = self.ensure_folder(library_root, &request.category, sub, &state) {
                let label = folder_rel(&request.category, sub);
                warn!("Could not create {}: {}", label, err);
                skipped.push(SkipRecord::new(
                    label,
                    &SkipReason::FolderCreateFailed(err.to_string()),
                ));
            }
        }

        info!("Applying {} placements", plan.placements.len());
        reporter.on_apply_start(plan.placements.len());

        let indexed: Vec<(usize, &Placement)> = plan.placements.iter().enumerate().collect();
        if self.parallel {
            let mut groups: Vec<Vec<(usize, &Placement)>> = Vec::new();
            let mut by_folder: HashMap<String, usize> = HashMap::new();
            for (index, placement) in indexed {
                // Case-folded so folders that collide on case-insensitive
                // volumes share a group.
                let key = folder_rel(&placement.category, placement.target_subcategory())
                    .to_lowercase();
                let slot = *by_folder.entry(key).or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[slot].push((index, placement));
            }
            groups.par_iter().for_each(|group| {
                self.run_sequence(source_root, library_root, group, cancel, reporter, &state)
            });
        } else {
            self.run_sequence(source_root, library_root, &indexed, cancel, reporter, &state);
        }

        let cancelled = cancel.is_cancelled() || state.halted.is_cancelled();
        let mut placement_skips = state
            .skipped
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        placement_skips.sort_by_key(|(index, _)| *index);
        skipped.extend(placement_skips.into_iter().map(|(_, record)| record));
        let writer = state
            .writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let created_folders = writer.created_folders().to_vec();
        let log = writer.finish();

        let duration = start.elapsed();
        info!(
            "Plan applied in {:.2}s: {} moved, {} skipped{}",
            duration.as_secs_f64(),
            log.operations.len(),
            skipped.len(),
            if cancelled { " (cancelled)" } else { "" }
        );
        reporter.on_apply_complete(
            log.operations.len(),
            skipped.len(),
            duration.as_secs_f64(),
        );

        Ok(ApplyReport {
            log,
            log_path,
            skipped,
            created_folders,
            cancelled,
        })
    }

    fn run_sequence(
        &self,
        source_root: &Path,
        library_root: &Path,
        placements: &[(usize, &Placement)],
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
        state: &RunState<'_>,
    ) {
        for (index, placement) in placements {
            if cancel.is_cancelled() || state.halted.is_cancelled() {
                let record = SkipRecord::new(placement.path.clone(), &SkipReason::Cancelled);
                lock(&state.skipped).push((*index, record));
                continue;
            }

            match self.place(source_root, library_root, placement, state) {
                Ok(op) => {
                    debug!("{} -> {}", op.source_rel, op.destination_rel);
                    if let Err(err) = lock(&state.writer).append(op) {
                        // The move happened but could not be recorded; stop
                        // before anything else goes unrecorded.
                        error!("Failed to persist move log: {}", err);
                        state.halted.cancel();
                    }
                }
                Err(reason) => {
                    warn!("Skipping {}: {}", placement.path, reason);
                    let record = SkipRecord::new(placement.path.clone(), &reason);
                    lock(&state.skipped).push((*index, record));
                }
            }
            let done = state.done.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_apply_progress(done, state.total, &placement.path);
        }
    }

    fn place(
        &self,
        source_root: &Path,
        library_root: &Path,
        placement: &Placement,
        state: &RunState<'_>,
    ) -> Result<MoveOp, SkipReason> {
        let source_path = rel_to_path(source_root, &placement.path);
        let entry = self
            .fs
            .entry(&source_path)
            .map_err(|_| SkipReason::SourceNotFound)?;

        let sub = placement.target_subcategory();
        let dest_dir = self
            .ensure_folder(library_root, &placement.category, sub, state)
            .map_err(|e| SkipReason::MoveFailed(e.to_string()))?;

        let is_dir = entry.kind == EntryKind::Directory;
        let name = unique_child_name(self.fs, &dest_dir, &placement.path, is_dir)
            .map_err(|e| SkipReason::MoveFailed(e.to_string()))?;

        let relocation = relocate(self.fs, &source_path, &dest_dir.join(&name))
            .map_err(|e| SkipReason::MoveFailed(e.to_string()))?;
        if relocation != Relocation::Renamed {
            debug!("{} relocated by copy ({:?})", placement.path, relocation);
        }

        Ok(MoveOp {
            source_rel: placement.path.clone(),
            destination_rel: format!("{}/{}", folder_rel(&placement.category, sub), name),
            reason: placement.reason.clone(),
        })
    }

    /// Create `category` and `category/sub` when absent; existing folders
    /// are left alone.
    fn ensure_folder(
        &self,
        library_root: &Path,
        category: &str,
        sub: Option<&str>,
        state: &RunState<'_>,
    ) -> std::io::Result<PathBuf> {
        let category_dir = library_root.join(category);
        self.ensure_dir(&category_dir, category, state)?;
        match sub {
            None => Ok(category_dir),
            Some(sub) => {
                let sub_dir = category_dir.join(sub);
                self.ensure_dir(&sub_dir, &folder_rel(category, Some(sub)), state)?;
                Ok(sub_dir)
            }
        }
    }

    fn ensure_dir(&self, dir: &Path, label: &str, state: &RunState<'_>) -> std::io::Result<()> {
        match self.fs.entry(dir) {
            Ok(entry) if entry.kind == EntryKind::Directory => Ok(()),
            Ok(_) => Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a folder", dir.display()),
            )),
            Err(_) => match self.fs.create_dir(dir) {
                Ok(()) => {
                    info!("Created folder {}", label);
                    if let Err(err) = lock(&state.writer).record_created_folder(label) {
                        warn!("Could not record created folder {}: {}", label, err);
                    }
                    Ok(())
                }
                // Another group created it first.
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
                Err(err) => Err(err),
            },
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_paths_use_forward_slashes() {
        assert_eq!(folder_rel("Docs", None), "Docs");
        assert_eq!(folder_rel("Docs", Some("Taxes")), "Docs/Taxes");
        let path = rel_to_path(Path::new("/lib"), "Docs/Taxes/a.pdf");
        assert_eq!(path, Path::new("/lib").join("Docs").join("Taxes").join("a.pdf"));
    }
}
