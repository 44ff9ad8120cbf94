use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::AppConfig;
use crate::error::{Error, SkipRecord};
use crate::executor::{ApplyReport, PlanExecutor};
use crate::fsys::{FileSystem, LocalFs};
use crate::model::{LibraryIndex, MoveLog, Plan, PlannerInput, SourceOverview};
use crate::planner::Planner;
use crate::progress::ProgressReporter;
use crate::scanner::{LibraryIndexer, SourceScanner};
use crate::undo::{UndoEngine, UndoOptions, UndoReport};
use crate::validate::validate_plan;
use crate::workspace::{load_created_folders, ArtifactKind, Workspace};

/// Runs create-plan, apply and undo for one (SOURCE, LIBRARY) pair.
pub struct Organizer {
    config: AppConfig,
    workspace: Workspace,
    fs: Box<dyn FileSystem>,
    cancel: CancelToken,
}

#[derive(Debug)]
pub struct PlanResult {
    pub overview: SourceOverview,
    pub index: LibraryIndex,
    pub plan: Plan,
    pub plan_path: PathBuf,
    pub scan_duration: Duration,
    pub index_duration: Duration,
    pub planner_duration: Duration,
}

#[derive(Debug)]
pub struct ApplyResult {
    pub validation_skips: Vec<SkipRecord>,
    pub report: ApplyReport,
    pub scan_duration: Duration,
    pub apply_duration: Duration,
}

impl ApplyResult {
    /// Every item that was not moved, validation first.
    pub fn all_skips(&self) -> impl Iterator<Item = &SkipRecord> {
        self.validation_skips.iter().chain(self.report.skipped.iter())
    }
}

#[derive(Debug)]
pub struct UndoResult {
    pub log_path: PathBuf,
    pub report: UndoReport,
    pub undo_duration: Duration,
}

impl Organizer {
    /// Open (or create) the workspace for the pair using the local disk.
    pub fn open(config: AppConfig, source_root: &Path, library_root: &Path) -> Result<Self, Error> {
        Self::with_fs(config, source_root, library_root, Box::new(LocalFs))
    }

    pub fn with_fs(
        config: AppConfig,
        source_root: &Path,
        library_root: &Path,
        fs: Box<dyn FileSystem>,
    ) -> Result<Self, Error> {
        let workspace = Workspace::open(&config.workspace_base(), source_root, library_root)?;
        Ok(Self {
            config,
            workspace,
            fs,
            cancel: CancelToken::new(),
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Observe `cancel` in every long-running step; cancelling it stops
    /// work between items.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scan SOURCE and save the inventory.
    pub fn scan_source(&self, reporter: &dyn ProgressReporter) -> Result<SourceOverview, Error> {
        let options = self.config.scan_options(self.workspace.library_root());
        let overview = SourceScanner::new(self.fs.as_ref(), options).scan(
            self.workspace.source_root(),
            &self.cancel,
            reporter,
        )?;
        let path = self.workspace.save(ArtifactKind::SourceInventory, &overview)?;
        debug!("Source inventory saved to {}", path.display());
        Ok(overview)
    }

    /// Index LIBRARY and save the index.
    pub fn index_library(&self, reporter: &dyn ProgressReporter) -> Result<LibraryIndex, Error> {
        let index = LibraryIndexer::new(
            self.fs.as_ref(),
            self.config.sample_limit,
            &self.config.ignore_patterns,
        )
        .index(self.workspace.library_root(), &self.cancel, reporter)?;
        let path = self.workspace.save(ArtifactKind::LibraryIndex, &index)?;
        debug!("Library index saved to {}", path.display());
        Ok(index)
    }

    /// Scan, index, ask the planner and save its plan.
    pub fn create_plan(
        &self,
        planner: &dyn Planner,
        reporter: &dyn ProgressReporter,
    ) -> Result<PlanResult, Error> {
        info!("Scanning {}", self.workspace.source_root().display());
        let scan_start = Instant::now();
        let overview = self.scan_source(reporter)?;
        let scan_duration = scan_start.elapsed();

        info!("Indexing {}", self.workspace.library_root().display());
        let index_start = Instant::now();
        let index = self.index_library(reporter)?;
        let index_duration = index_start.elapsed();

        info!("Requesting plan from {} planner", planner.name());
        let planner_start = Instant::now();
        let input = PlannerInput {
            source: overview,
            library: index,
        };
        let plan = planner.plan(&input)?;
        let planner_duration = planner_start.elapsed();
        let plan_path = self.workspace.save(ArtifactKind::Plan, &plan)?;
        info!(
            "Plan with {} placements and {} new folders saved to {}",
            plan.placements.len(),
            plan.new_folders.len(),
            plan_path.display()
        );

        Ok(PlanResult {
            overview: input.source,
            index: input.library,
            plan,
            plan_path,
            scan_duration,
            index_duration,
            planner_duration,
        })
    }

    pub fn latest_plan(&self) -> Result<Option<Plan>, Error> {
        self.workspace.load_latest(ArtifactKind::Plan)
    }

    pub fn apply_latest_plan(&self, reporter: &dyn ProgressReporter) -> Result<ApplyResult, Error> {
        let plan = self.latest_plan()?.ok_or_else(|| {
            Error::Workspace(format!(
                "no plan in workspace {}; create one first",
                self.workspace.key()
            ))
        })?;
        self.run_apply(&plan, reporter)
    }

    /// Apply an explicitly supplied plan. It becomes the latest plan first.
    pub fn apply_plan(
        &self,
        plan: &Plan,
        reporter: &dyn ProgressReporter,
    ) -> Result<ApplyResult, Error> {
        self.workspace.save(ArtifactKind::Plan, plan)?;
        self.run_apply(plan, reporter)
    }

    /// The plan may be stale, so both sides are re-read before validating.
    fn run_apply(
        &self,
        plan: &Plan,
        reporter: &dyn ProgressReporter,
    ) -> Result<ApplyResult, Error> {
        let scan_start = Instant::now();
        let overview = self.scan_source(reporter)?;
        let index = self.index_library(reporter)?;
        let scan_duration = scan_start.elapsed();

        let validated = validate_plan(&overview, &index, plan);
        info!(
            "{} of {} placements passed validation",
            validated.plan.placements.len(),
            plan.placements.len()
        );

        let apply_start = Instant::now();
        let report = PlanExecutor::new(self.fs.as_ref(), &self.workspace)
            .with_parallel(self.config.parallel_moves)
            .execute(
                self.workspace.source_root(),
                self.workspace.library_root(),
                &validated.plan,
                &self.cancel,
                reporter,
            )?;
        let apply_duration = apply_start.elapsed();

        Ok(ApplyResult {
            validation_skips: validated.skipped,
            report,
            scan_duration,
            apply_duration,
        })
    }

    /// Undo the latest move log, or `log_file` when given.
    pub fn undo_latest(
        &self,
        options: &UndoOptions,
        log_file: Option<&Path>,
        reporter: &dyn ProgressReporter,
    ) -> Result<UndoResult, Error> {
        let (log, log_path): (MoveLog, PathBuf) = match log_file {
            Some(path) => (Workspace::load_file(path)?, path.to_path_buf()),
            None => {
                let path = self.workspace.latest_path(ArtifactKind::Moves);
                let log = self.workspace.load_latest(ArtifactKind::Moves)?.ok_or_else(|| {
                    Error::Workspace(format!(
                        "no move log in workspace {}; nothing to undo",
                        self.workspace.key()
                    ))
                })?;
                (log, path)
            }
        };

        let created_folders = load_created_folders(&log_path)?;
        let undo_start = Instant::now();
        let report = UndoEngine::new(self.fs.as_ref()).undo(
            &log,
            &created_folders,
            options,
            &self.cancel,
            reporter,
        );
        Ok(UndoResult {
            log_path,
            report,
            undo_duration: undo_start.elapsed(),
        })
    }
}
